// libs/waitlist-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::TenantContext;

use crate::models::{AddToWaitlistRequest, FreedSlot, WaitlistListQuery, WaitlistStatusUpdate};
use crate::router::WaitlistState;

// ==============================================================================
// STAFF HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_to_waitlist(
    State(state): State<WaitlistState>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<AddToWaitlistRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let entry = state.waitlist.add_entry(tenant.tenant_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "entry": entry
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_waitlist(
    State(state): State<WaitlistState>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<WaitlistListQuery>,
) -> Result<Json<Value>, AppError> {
    let entries = state.waitlist.list_entries(tenant.tenant_id, query.status).await?;

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn find_waitlist_matches(
    State(state): State<WaitlistState>,
    Extension(tenant): Extension<TenantContext>,
    Query(slot): Query<FreedSlot>,
) -> Result<Json<Value>, AppError> {
    let matches = state.matcher.find_matches(tenant.tenant_id, &slot).await?;

    Ok(Json(json!({
        "slot": slot,
        "matches": matches,
        "total": matches.len()
    })))
}

#[axum::debug_handler]
pub async fn notify_waitlist_entry(
    State(state): State<WaitlistState>,
    Extension(tenant): Extension<TenantContext>,
    Path(entry_id): Path<Uuid>,
    Json(slot): Json<FreedSlot>,
) -> Result<Json<Value>, AppError> {
    let entry = state
        .notifier
        .notify_entry(tenant.tenant_id, entry_id, &slot)
        .await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry,
        "message": "Customer notified about the available slot"
    })))
}

#[axum::debug_handler]
pub async fn update_waitlist_status(
    State(state): State<WaitlistState>,
    Extension(tenant): Extension<TenantContext>,
    Path(entry_id): Path<Uuid>,
    Json(update): Json<WaitlistStatusUpdate>,
) -> Result<Json<Value>, AppError> {
    let entry = state
        .waitlist
        .set_status(tenant.tenant_id, entry_id, update.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry
    })))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn public_join_waitlist(
    State(state): State<WaitlistState>,
    Path(tenant_slug): Path<String>,
    Json(request): Json<AddToWaitlistRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let entry = state.waitlist.add_public_entry(&tenant_slug, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "entry_id": entry.id,
            "message": "You have been added to the waiting list"
        })),
    ))
}
