// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::SchedulingService;

pub fn appointment_routes(config: Arc<AppConfig>, scheduling: Arc<SchedulingService>) -> Router {
    // Staff operations, scoped to the tenant bound to the caller's token
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/availability", get(handlers::get_available_slots))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route("/reminders/due", get(handlers::list_due_reminders))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))
        .route(
            "/{appointment_id}/reminder",
            post(handlers::mark_reminder_sent).delete(handlers::reset_reminder_sent),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(scheduling)
}

/// Confirmation links sent to customers, mounted under `/public`.
pub fn public_appointment_routes(scheduling: Arc<SchedulingService>) -> Router {
    Router::new()
        .route(
            "/{tenant_slug}/appointments/{token}/confirm",
            post(handlers::confirm_by_token),
        )
        .route(
            "/{tenant_slug}/appointments/{token}/decline",
            post(handlers::decline_by_token),
        )
        .with_state(scheduling)
}
