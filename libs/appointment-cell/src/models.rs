// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::{Appointment, AppointmentStatus, CustomerResponse, WaitlistEntry};
use waitlist_cell::WaitlistError;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    /// Book this employee. Takes precedence over `first_available`.
    pub employee_id: Option<Uuid>,
    /// Assign the first eligible employee free at `start_time`.
    #[serde(default)]
    pub first_available: bool,
    pub start_time: NaiveDateTime,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn employee_choice(&self) -> EmployeeChoice {
        match (self.employee_id, self.first_available) {
            (Some(employee_id), _) => EmployeeChoice::Specific(employee_id),
            (None, true) => EmployeeChoice::FirstAvailable,
            (None, false) => EmployeeChoice::Unassigned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeChoice {
    Specific(Uuid),
    FirstAvailable,
    /// Assignment is deferred; unassigned appointments hold no employee time.
    Unassigned,
}

/// Moves an appointment. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub start_time: Option<NaiveDateTime>,
    pub service_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub unassign_employee: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub service_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub employee_id: Uuid,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DueRemindersQuery {
    pub hours_ahead: Option<i64>,
    /// Tenant wall-clock "now". Defaults to the server's local time.
    pub now: Option<NaiveDateTime>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub service_id: Uuid,
    pub date: NaiveDate,
    /// Bookable start times as `"HH:MM"`, ascending.
    pub slots: Vec<String>,
}

/// Result of a status change. Cancellations carry the waitlist entries that
/// could take the freed slot; nobody is notified automatically.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub appointment: Appointment,
    pub waitlist_matches: Vec<WaitlistEntry>,
    /// The change was stored but the waitlist could not be searched, so an
    /// empty `waitlist_matches` means "unknown" rather than "nobody".
    pub waitlist_lookup_failed: bool,
}

impl StatusChange {
    pub fn unchanged(appointment: Appointment) -> Self {
        Self {
            appointment,
            waitlist_matches: Vec::new(),
            waitlist_lookup_failed: false,
        }
    }
}

/// Outcome of a customer confirming or declining through their token.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TokenResponseOutcome {
    Applied(StatusChange),
    /// The customer already answered; nothing changed.
    AlreadyResponded {
        appointment: Appointment,
        customer_response: CustomerResponse,
    },
    /// The appointment is canceled, completed or a no-show; nothing changed.
    NotActionable { appointment: Appointment },
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Service is not active")]
    ServiceInactive,

    #[error("Employee is already booked at this time")]
    EmployeeDoubleBooked,

    #[error("No employee is available at this time")]
    NoEmployeeAvailable,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was changed by another request")]
    ConcurrentModification,

    #[error("Could not issue a unique confirmation token")]
    TokenGenerationFailed,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Waitlist error: {0}")]
    Waitlist(#[from] WaitlistError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for AppointmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(_) => AppointmentError::AppointmentNotFound,
            StoreError::Conflict(_) => AppointmentError::EmployeeDoubleBooked,
            StoreError::DuplicateToken => AppointmentError::TokenGenerationFailed,
            StoreError::Stale(_) => AppointmentError::ConcurrentModification,
            StoreError::Unexpected(e) => AppointmentError::DatabaseError(e.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::AppointmentNotFound
            | AppointmentError::ServiceNotFound
            | AppointmentError::EmployeeNotFound
            | AppointmentError::TenantNotFound => AppError::NotFound(error.to_string()),
            AppointmentError::EmployeeDoubleBooked => AppError::SlotUnavailable(
                "Appointment slot no longer available".to_string(),
            ),
            AppointmentError::NoEmployeeAvailable => AppError::SlotUnavailable(error.to_string()),
            AppointmentError::ServiceInactive | AppointmentError::ValidationError(_) => {
                AppError::ValidationError(error.to_string())
            }
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::ConcurrentModification => {
                AppError::Conflict(error.to_string())
            }
            AppointmentError::Waitlist(inner) => inner.into(),
            AppointmentError::TokenGenerationFailed | AppointmentError::DatabaseError(_) => {
                AppError::Internal(error.to_string())
            }
        }
    }
}
