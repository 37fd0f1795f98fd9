// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::TenantContext;

use crate::models::{
    AvailabilityQuery, AvailabilityResponse, ConflictCheckQuery, CreateAppointmentRequest,
    DueRemindersQuery, RescheduleAppointmentRequest, StatusUpdateRequest, TokenResponseOutcome,
};
use crate::services::SchedulingService;

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let slots = scheduling
        .get_available_slots(tenant.tenant_id, query.service_id, query.date)
        .await?;

    Ok(Json(AvailabilityResponse {
        service_id: query.service_id,
        date: query.date,
        slots,
    }))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let has_conflict = scheduling
        .check_conflict(
            tenant.tenant_id,
            Some(query.employee_id),
            query.start_time,
            query.end_time,
            query.exclude_appointment_id,
        )
        .await?;

    Ok(Json(json!({
        "has_conflict": has_conflict,
        "employee_id": query.employee_id,
        "start_time": query.start_time,
        "end_time": query.end_time
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = scheduling.create_appointment(tenant.tenant_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduling.get_appointment(tenant.tenant_id, appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduling
        .reschedule_appointment(tenant.tenant_id, appointment_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let change = scheduling
        .set_appointment_status(tenant.tenant_id, appointment_id, request.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": change.appointment,
        "waitlist_matches": change.waitlist_matches,
        "waitlist_lookup_failed": change.waitlist_lookup_failed
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    scheduling.delete_appointment(tenant.tenant_id, appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[axum::debug_handler]
pub async fn mark_reminder_sent(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduling.mark_reminder_sent(tenant.tenant_id, appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn reset_reminder_sent(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = scheduling.reset_reminder_sent(tenant.tenant_id, appointment_id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn list_due_reminders(
    State(scheduling): State<Arc<SchedulingService>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<DueRemindersQuery>,
) -> Result<Json<Value>, AppError> {
    let now = query.now.unwrap_or_else(|| Local::now().naive_local());
    let appointments = scheduling
        .list_due_reminders(tenant.tenant_id, now, query.hours_ahead)
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

// ==============================================================================
// PUBLIC TOKEN ACTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_by_token(
    State(scheduling): State<Arc<SchedulingService>>,
    Path((tenant_slug, token)): Path<(String, String)>,
) -> Result<Json<TokenResponseOutcome>, AppError> {
    let outcome = scheduling.confirm_by_token(&tenant_slug, &token).await?;
    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn decline_by_token(
    State(scheduling): State<Arc<SchedulingService>>,
    Path((tenant_slug, token)): Path<(String, String)>,
) -> Result<Json<TokenResponseOutcome>, AppError> {
    let outcome = scheduling.decline_by_token(&tenant_slug, &token).await?;
    Ok(Json(outcome))
}
