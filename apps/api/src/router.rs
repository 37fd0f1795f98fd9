use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use appointment_cell::{appointment_routes, public_appointment_routes, SchedulingService};
use shared_config::AppConfig;
use shared_database::SchedulingStore;
use waitlist_cell::{public_waitlist_routes, waitlist_routes, NotificationDispatch, WaitlistState};

pub fn create_router(
    config: Arc<AppConfig>,
    store: Arc<dyn SchedulingStore>,
    dispatcher: Arc<dyn NotificationDispatch>,
) -> Router {
    let scheduling = Arc::new(SchedulingService::new(Arc::clone(&store), &config));
    let waitlist = WaitlistState::new(Arc::clone(&store), &config, dispatcher);

    let public = Router::new()
        .merge(public_appointment_routes(Arc::clone(&scheduling)))
        .merge(public_waitlist_routes(waitlist.clone()));

    Router::new()
        .route("/", get(|| async { "Booking API is running!" }))
        .route("/health", get(health_check))
        .with_state(store)
        .nest("/appointments", appointment_routes(Arc::clone(&config), scheduling))
        .nest("/waitlist", waitlist_routes(config, waitlist))
        .nest("/public", public)
}

async fn health_check(State(store): State<Arc<dyn SchedulingStore>>) -> (StatusCode, Json<Value>) {
    match store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": store.backend_name() })),
        ),
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "store": store.backend_name() })),
            )
        }
    }
}
