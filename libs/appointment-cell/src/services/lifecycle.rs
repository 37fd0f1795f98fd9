// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shared_models::{Appointment, AppointmentStatus, CustomerResponse};

use crate::models::AppointmentError;

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Staff,
    Customer,
}

/// What applying a customer's token action did to the appointment.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerAction {
    Applied,
    AlreadyResponded(CustomerResponse),
    NotActionable,
}

/// The appointment status machine.
///
/// Staff may move an appointment between any two statuses; completed and
/// no-show are final in practice but stay correctable. Customers act only
/// through their confirmation token, once, and only while the appointment is
/// still upcoming.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn get_valid_transitions(&self, current: AppointmentStatus, actor: Actor) -> Vec<AppointmentStatus> {
        match actor {
            Actor::Staff => AppointmentStatus::ALL
                .into_iter()
                .filter(|status| *status != current)
                .collect(),
            Actor::Customer => match current {
                AppointmentStatus::Scheduled | AppointmentStatus::Confirmed => {
                    vec![AppointmentStatus::Confirmed, AppointmentStatus::Canceled]
                }
                AppointmentStatus::Completed
                | AppointmentStatus::Canceled
                | AppointmentStatus::NoShow => vec![],
            },
        }
    }

    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
        actor: Actor,
    ) -> Result<(), AppointmentError> {
        if self.get_valid_transitions(current, actor).contains(&next) {
            debug!("Status transition validated: {} -> {} ({:?})", current, next, actor);
            return Ok(());
        }

        warn!("Invalid status transition attempted: {} -> {} ({:?})", current, next, actor);
        Err(AppointmentError::InvalidStatusTransition {
            from: current,
            to: next,
        })
    }

    /// Staff status change. Setting the current status again is accepted as a no-op.
    pub fn apply_staff_status(
        &self,
        appointment: &mut Appointment,
        next: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        if appointment.status == next {
            return Ok(false);
        }
        self.validate_status_transition(appointment.status, next, Actor::Staff)?;

        appointment.status = next;
        appointment.updated_at = now;
        Ok(true)
    }

    /// Customer confirm or decline through the token. One-shot: once a
    /// response is recorded, later actions change nothing.
    pub fn apply_customer_response(
        &self,
        appointment: &mut Appointment,
        response: CustomerResponse,
        now: DateTime<Utc>,
    ) -> CustomerAction {
        if let Some(previous) = appointment.customer_response {
            return CustomerAction::AlreadyResponded(previous);
        }

        let next = match response {
            CustomerResponse::Confirmed => AppointmentStatus::Confirmed,
            CustomerResponse::Declined => AppointmentStatus::Canceled,
        };
        if self
            .validate_status_transition(appointment.status, next, Actor::Customer)
            .is_err()
        {
            return CustomerAction::NotActionable;
        }

        appointment.status = next;
        appointment.customer_response = Some(response);
        appointment.customer_confirmed_at = Some(now);
        appointment.updated_at = now;
        CustomerAction::Applied
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
