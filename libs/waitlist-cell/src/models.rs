// libs/waitlist-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::{Appointment, CustomerContact, WaitlistStatus};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToWaitlistRequest {
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub preferred_date_from: NaiveDate,
    pub preferred_date_to: NaiveDate,
    #[serde(default, with = "shared_models::clock::hh_mm_option")]
    pub preferred_time_from: Option<NaiveTime>,
    #[serde(default, with = "shared_models::clock::hh_mm_option")]
    pub preferred_time_to: Option<NaiveTime>,
    pub priority: Option<i32>,
    pub notes: Option<String>,
}

/// The slot released by a cancellation, as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreedSlot {
    pub service_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "shared_models::clock::hh_mm")]
    pub time: NaiveTime,
    pub employee_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

impl FreedSlot {
    pub fn from_appointment(appointment: &Appointment) -> Self {
        Self {
            service_id: appointment.service_id,
            date: appointment.start_time.date(),
            time: appointment.start_time.time(),
            employee_id: appointment.employee_id,
            location_id: appointment.location_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WaitlistListQuery {
    pub status: Option<WaitlistStatus>,
}

#[derive(Debug, Deserialize)]
pub struct WaitlistStatusUpdate {
    pub status: WaitlistStatus,
}

// ==============================================================================
// NOTIFICATION MODELS
// ==============================================================================

pub const WAITLIST_SLOT_TEMPLATE: &str = "waitlist_slot_available";

/// Template data for the slot-available message. Message bodies are composed
/// by the delivery side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotOffer {
    pub service_id: Uuid,
    pub service_name: String,
    pub date: NaiveDate,
    #[serde(with = "shared_models::clock::hh_mm")]
    pub time: NaiveTime,
    pub employee_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub tenant_id: Uuid,
    pub waitlist_entry_id: Uuid,
    pub template: String,
    pub contact: CustomerContact,
    pub data: SlotOffer,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum WaitlistError {
    #[error("Waitlist entry not found")]
    EntryNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Waitlist entry is {status} and cannot be notified")]
    NotNotifiable { status: WaitlistStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for WaitlistError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(_) => WaitlistError::EntryNotFound,
            other => WaitlistError::DatabaseError(other.to_string()),
        }
    }
}

impl From<WaitlistError> for AppError {
    fn from(error: WaitlistError) -> Self {
        match error {
            WaitlistError::EntryNotFound => AppError::NotFound("Waitlist entry not found".to_string()),
            WaitlistError::ServiceNotFound => AppError::NotFound("Service not found".to_string()),
            WaitlistError::TenantNotFound => AppError::NotFound("Business not found".to_string()),
            WaitlistError::NotNotifiable { status } => AppError::Conflict(format!(
                "Waitlist entry is {} and cannot be notified",
                status
            )),
            WaitlistError::ValidationError(msg) => AppError::ValidationError(msg),
            WaitlistError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
