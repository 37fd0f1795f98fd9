// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::{SchedulingStore, StoreError};
use shared_models::{Appointment, AppointmentStatus, CustomerResponse, Employee, Service};
use waitlist_cell::{FreedSlot, WaitlistMatcher};

use crate::models::{
    AppointmentError, CreateAppointmentRequest, EmployeeChoice, RescheduleAppointmentRequest,
    StatusChange, TokenResponseOutcome,
};
use crate::services::availability::AvailabilityCalculator;
use crate::services::conflict::ConflictGuard;
use crate::services::lifecycle::{AppointmentLifecycleService, CustomerAction};
use crate::services::token::ConfirmationTokenGenerator;

const TOKEN_ATTEMPTS: usize = 3;
const RESPONSE_ATTEMPTS: usize = 3;

/// Row timestamps are kept at microsecond precision so a read-back value
/// matches what Postgres stored.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Appointment writes. Every insert or update that changes time, employee or
/// status goes through the store's atomic overlap check; a lost race comes
/// back as [`AppointmentError::EmployeeDoubleBooked`] and is never retried
/// with another slot. Updates are conditional on the `updated_at` that was
/// read, so a concurrent writer yields [`AppointmentError::ConcurrentModification`]
/// instead of a silent overwrite.
pub struct AppointmentBookingService {
    store: Arc<dyn SchedulingStore>,
    availability: Arc<AvailabilityCalculator>,
    conflicts: Arc<ConflictGuard>,
    lifecycle: AppointmentLifecycleService,
    tokens: Arc<dyn ConfirmationTokenGenerator>,
    matcher: Arc<WaitlistMatcher>,
    reminder_lookahead_hours: i64,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        availability: Arc<AvailabilityCalculator>,
        conflicts: Arc<ConflictGuard>,
        tokens: Arc<dyn ConfirmationTokenGenerator>,
        matcher: Arc<WaitlistMatcher>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            store,
            availability,
            conflicts,
            lifecycle: AppointmentLifecycleService::new(),
            tokens,
            matcher,
            reminder_lookahead_hours: config.reminder_lookahead_hours,
        }
    }

    // ==========================================================================
    // CREATE / RESCHEDULE
    // ==========================================================================

    #[instrument(skip(self, request), fields(service_id = %request.service_id, start = %request.start_time))]
    pub async fn create_appointment(
        &self,
        tenant_id: Uuid,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let service = self.availability.active_service(tenant_id, request.service_id).await?;
        let start_time = request.start_time;
        let end_time = start_time + service.duration();

        let employee_id = match request.employee_choice() {
            EmployeeChoice::Specific(employee_id) => {
                self.bookable_employee(tenant_id, &service, employee_id).await?;
                if self
                    .conflicts
                    .check_conflict(tenant_id, Some(employee_id), start_time, end_time, None)
                    .await?
                {
                    return Err(AppointmentError::EmployeeDoubleBooked);
                }
                Some(employee_id)
            }
            EmployeeChoice::FirstAvailable => {
                let employee = self
                    .first_available_employee(tenant_id, &service, start_time, end_time)
                    .await?
                    .ok_or(AppointmentError::NoEmployeeAvailable)?;
                Some(employee.id)
            }
            EmployeeChoice::Unassigned => None,
        };

        let now = now();
        let mut appointment = Appointment {
            id: Uuid::new_v4(),
            tenant_id,
            customer_id: request.customer_id,
            service_id: service.id,
            employee_id,
            location_id: request.location_id,
            start_time,
            end_time,
            price: service.price,
            status: AppointmentStatus::Scheduled,
            customer_response: None,
            customer_confirmed_at: None,
            reminder_sent_at: None,
            confirmation_token: String::new(),
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        // The token is unique before the row exists: a collision rejects the
        // whole insert and a fresh token is drawn.
        for attempt in 1..=TOKEN_ATTEMPTS {
            appointment.confirmation_token = self.tokens.generate();
            match self.store.insert_appointment(appointment.clone()).await {
                Ok(saved) => {
                    info!(
                        "Created appointment {} for employee {:?} at {}",
                        saved.id, saved.employee_id, saved.start_time
                    );
                    return Ok(saved);
                }
                Err(StoreError::DuplicateToken) => {
                    warn!("Confirmation token collision on attempt {}", attempt);
                }
                Err(StoreError::Conflict(reason)) => {
                    info!("Slot taken while booking: {}", reason);
                    return Err(AppointmentError::EmployeeDoubleBooked);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppointmentError::TokenGenerationFailed)
    }

    #[instrument(skip(self, request))]
    pub async fn reschedule_appointment(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.get_appointment(tenant_id, appointment_id).await?;
        let read_at = appointment.updated_at;

        let service_id = request.service_id.unwrap_or(appointment.service_id);
        let service = self.availability.active_service(tenant_id, service_id).await?;
        let start_time = request.start_time.unwrap_or(appointment.start_time);
        let end_time = start_time + service.duration();

        let employee_id = match (request.unassign_employee, request.employee_id) {
            (true, _) => None,
            (false, Some(employee_id)) => Some(employee_id),
            (false, None) => appointment.employee_id,
        };

        if let Some(employee_id) = employee_id {
            if Some(employee_id) != appointment.employee_id || service.id != appointment.service_id {
                self.bookable_employee(tenant_id, &service, employee_id).await?;
            }
            if appointment.status.occupies_time()
                && self
                    .conflicts
                    .check_conflict(tenant_id, Some(employee_id), start_time, end_time, Some(appointment.id))
                    .await?
            {
                return Err(AppointmentError::EmployeeDoubleBooked);
            }
        }

        appointment.service_id = service.id;
        appointment.employee_id = employee_id;
        appointment.start_time = start_time;
        appointment.end_time = end_time;
        appointment.price = service.price;
        appointment.updated_at = now();

        let saved = self.store.update_appointment(appointment, read_at).await?;
        info!("Rescheduled appointment {} to {}", saved.id, saved.start_time);
        Ok(saved)
    }

    // ==========================================================================
    // STATUS
    // ==========================================================================

    /// Staff status change. A change to `canceled` returns waitlist matches
    /// for the freed slot.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<StatusChange, AppointmentError> {
        let mut appointment = self.get_appointment(tenant_id, appointment_id).await?;
        let previous = appointment.status;
        let read_at = appointment.updated_at;

        let changed = self
            .lifecycle
            .apply_staff_status(&mut appointment, status, now())?;
        if !changed {
            return Ok(StatusChange::unchanged(appointment));
        }

        let appointment = self.store.update_appointment(appointment, read_at).await?;
        info!("Appointment {} status {} -> {}", appointment.id, previous, appointment.status);

        Ok(self.status_change(tenant_id, previous, appointment).await)
    }

    /// Customer confirm/decline by token. The first answer wins: when another
    /// answer lands between the read and the write, the row is read again and
    /// the caller sees [`TokenResponseOutcome::AlreadyResponded`].
    #[instrument(skip(self, token))]
    pub async fn respond_by_token(
        &self,
        tenant_id: Uuid,
        token: &str,
        response: CustomerResponse,
    ) -> Result<TokenResponseOutcome, AppointmentError> {
        for attempt in 1..=RESPONSE_ATTEMPTS {
            let mut appointment = self
                .store
                .find_appointment_by_token(tenant_id, token)
                .await?
                .ok_or(AppointmentError::AppointmentNotFound)?;
            let previous = appointment.status;
            let read_at = appointment.updated_at;

            match self
                .lifecycle
                .apply_customer_response(&mut appointment, response, now())
            {
                CustomerAction::AlreadyResponded(customer_response) => {
                    debug!("Appointment {} already answered ({})", appointment.id, customer_response);
                    return Ok(TokenResponseOutcome::AlreadyResponded {
                        appointment,
                        customer_response,
                    });
                }
                CustomerAction::NotActionable => {
                    debug!("Appointment {} is {}, token action ignored", appointment.id, appointment.status);
                    return Ok(TokenResponseOutcome::NotActionable { appointment });
                }
                CustomerAction::Applied => {}
            }

            match self.store.update_appointment(appointment, read_at).await {
                Ok(appointment) => {
                    info!("Customer {} appointment {}", response, appointment.id);
                    let change = self.status_change(tenant_id, previous, appointment).await;
                    return Ok(TokenResponseOutcome::Applied(change));
                }
                Err(StoreError::Stale(reason)) => {
                    debug!("Token response attempt {} raced another write: {}", attempt, reason);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppointmentError::ConcurrentModification)
    }

    // ==========================================================================
    // REMINDERS
    // ==========================================================================

    pub async fn mark_reminder_sent(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.get_appointment(tenant_id, appointment_id).await?;
        let read_at = appointment.updated_at;
        let now = now();
        appointment.reminder_sent_at = Some(now);
        appointment.updated_at = now;
        Ok(self.store.update_appointment(appointment, read_at).await?)
    }

    pub async fn reset_reminder_sent(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.get_appointment(tenant_id, appointment_id).await?;
        let read_at = appointment.updated_at;
        appointment.reminder_sent_at = None;
        appointment.updated_at = now();
        Ok(self.store.update_appointment(appointment, read_at).await?)
    }

    /// Upcoming scheduled or confirmed appointments without a reminder,
    /// starting between `now` and `now + hours_ahead` (tenant wall clock).
    pub async fn due_reminders(
        &self,
        tenant_id: Uuid,
        now: NaiveDateTime,
        hours_ahead: Option<i64>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let hours = hours_ahead.unwrap_or(self.reminder_lookahead_hours);
        if hours <= 0 {
            return Err(AppointmentError::ValidationError(
                "hours_ahead must be positive".to_string(),
            ));
        }
        Ok(self
            .store
            .list_reminder_candidates(tenant_id, now, now + Duration::hours(hours))
            .await?)
    }

    // ==========================================================================
    // READ / DELETE
    // ==========================================================================

    pub async fn get_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(tenant_id, appointment_id)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound)
    }

    /// Removes the row. Unlike cancellation this leaves no history and does
    /// not look for waitlist matches.
    pub async fn delete_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.store.delete_appointment(tenant_id, appointment_id).await?;
        info!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn bookable_employee(
        &self,
        tenant_id: Uuid,
        service: &Service,
        employee_id: Uuid,
    ) -> Result<Employee, AppointmentError> {
        let employee = self
            .store
            .get_employee(tenant_id, employee_id)
            .await?
            .ok_or(AppointmentError::EmployeeNotFound)?;

        if !employee.is_active {
            return Err(AppointmentError::ValidationError(
                "Employee is not active".to_string(),
            ));
        }
        if !service.is_performed_by(employee.id) {
            return Err(AppointmentError::ValidationError(
                "Employee does not perform this service".to_string(),
            ));
        }
        Ok(employee)
    }

    /// First eligible employee, in store order, who works the whole interval
    /// and has nothing booked over it.
    async fn first_available_employee(
        &self,
        tenant_id: Uuid,
        service: &Service,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Option<Employee>, AppointmentError> {
        for employee in self.availability.eligible_employees(tenant_id, service).await? {
            if !employee.works_during(start, end) {
                continue;
            }
            if !self
                .conflicts
                .check_conflict(tenant_id, Some(employee.id), start, end, None)
                .await?
            {
                debug!("Assigning first available employee {}", employee.id);
                return Ok(Some(employee));
            }
        }
        Ok(None)
    }

    /// Attaches waitlist matches when this change just freed a slot. The
    /// cancellation is already stored, so a failed lookup does not fail the
    /// call; it is flagged on the result instead.
    async fn status_change(
        &self,
        tenant_id: Uuid,
        previous: AppointmentStatus,
        appointment: Appointment,
    ) -> StatusChange {
        if appointment.status != AppointmentStatus::Canceled || previous == AppointmentStatus::Canceled {
            return StatusChange::unchanged(appointment);
        }

        match self
            .matcher
            .find_matches(tenant_id, &FreedSlot::from_appointment(&appointment))
            .await
        {
            Ok(matches) => {
                info!(
                    "Cancellation of {} matched {} waitlist entries",
                    appointment.id,
                    matches.len()
                );
                StatusChange {
                    appointment,
                    waitlist_matches: matches,
                    waitlist_lookup_failed: false,
                }
            }
            Err(e) => {
                warn!("Waitlist lookup after cancelling {} failed: {}", appointment.id, e);
                StatusChange {
                    appointment,
                    waitlist_matches: Vec::new(),
                    waitlist_lookup_failed: true,
                }
            }
        }
    }
}
