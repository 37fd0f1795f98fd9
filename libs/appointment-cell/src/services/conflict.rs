// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::Appointment;

use crate::models::AppointmentError;

/// Overlap check against an employee's active appointments.
///
/// This read is advisory. The authoritative check runs inside the store's
/// insert and update, atomically with the write.
pub struct ConflictGuard {
    store: Arc<dyn SchedulingStore>,
}

impl ConflictGuard {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// `true` when `[start, end)` overlaps a non-canceled appointment of the
    /// employee other than `exclude_appointment_id`. Unassigned intervals never conflict.
    pub async fn check_conflict(
        &self,
        tenant_id: Uuid,
        employee_id: Option<Uuid>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        let Some(employee_id) = employee_id else {
            return Ok(false);
        };
        Ok(!self
            .conflicting_appointments(tenant_id, employee_id, start, end, exclude_appointment_id)
            .await?
            .is_empty())
    }

    pub async fn conflicting_appointments(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if end <= start {
            return Err(AppointmentError::ValidationError(
                "End time must be after start time".to_string(),
            ));
        }

        let conflicts: Vec<Appointment> = self
            .store
            .list_blocking_appointments(tenant_id, employee_id, start, end)
            .await?
            .into_iter()
            .filter(|existing| existing.blocks(employee_id, start, end, exclude_appointment_id))
            .collect();

        if !conflicts.is_empty() {
            debug!(
                "Employee {} has {} conflicting appointment(s) between {} and {}",
                employee_id,
                conflicts.len(),
                start,
                end
            );
        }
        Ok(conflicts)
    }
}
