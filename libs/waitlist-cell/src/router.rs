// libs/waitlist-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_database::SchedulingStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{NotificationDispatch, WaitlistMatcher, WaitlistNotifier, WaitlistService};

#[derive(Clone)]
pub struct WaitlistState {
    pub waitlist: Arc<WaitlistService>,
    pub matcher: Arc<WaitlistMatcher>,
    pub notifier: Arc<WaitlistNotifier>,
}

impl WaitlistState {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        config: &AppConfig,
        dispatcher: Arc<dyn NotificationDispatch>,
    ) -> Self {
        Self {
            waitlist: Arc::new(WaitlistService::new(Arc::clone(&store))),
            matcher: Arc::new(WaitlistMatcher::new(Arc::clone(&store), &config.scheduling)),
            notifier: Arc::new(WaitlistNotifier::new(store, dispatcher)),
        }
    }
}

pub fn waitlist_routes(config: Arc<AppConfig>, state: WaitlistState) -> Router {
    Router::new()
        .route("/", post(handlers::add_to_waitlist).get(handlers::list_waitlist))
        .route("/matches", get(handlers::find_waitlist_matches))
        .route("/{entry_id}/notify", post(handlers::notify_waitlist_entry))
        .route("/{entry_id}/status", put(handlers::update_waitlist_status))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}

/// Customer-facing routes, mounted under `/public`.
pub fn public_waitlist_routes(state: WaitlistState) -> Router {
    Router::new()
        .route("/{tenant_slug}/waitlist", post(handlers::public_join_waitlist))
        .with_state(state)
}
