// libs/appointment-cell/src/services/scheduling.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SchedulingStore;
use shared_models::{Appointment, AppointmentStatus, CustomerResponse, WaitlistEntry};
use waitlist_cell::{AddToWaitlistRequest, FreedSlot, WaitlistMatcher, WaitlistService};

use crate::models::{
    AppointmentError, CreateAppointmentRequest, RescheduleAppointmentRequest, StatusChange,
    TokenResponseOutcome,
};
use crate::services::availability::AvailabilityCalculator;
use crate::services::booking::AppointmentBookingService;
use crate::services::conflict::ConflictGuard;
use crate::services::token::{AlphanumericTokenGenerator, ConfirmationTokenGenerator};

/// Entry point for everything that schedules: the web backend and the
/// chat-booking flow call this, never the parts behind it.
pub struct SchedulingService {
    store: Arc<dyn SchedulingStore>,
    availability: Arc<AvailabilityCalculator>,
    conflicts: Arc<ConflictGuard>,
    booking: AppointmentBookingService,
    matcher: Arc<WaitlistMatcher>,
    waitlist: Arc<WaitlistService>,
}

impl SchedulingService {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &AppConfig) -> Self {
        let tokens = Arc::new(AlphanumericTokenGenerator::new(
            config.scheduling.confirmation_token_length,
        ));
        Self::with_token_generator(store, config, tokens)
    }

    pub fn with_token_generator(
        store: Arc<dyn SchedulingStore>,
        config: &AppConfig,
        tokens: Arc<dyn ConfirmationTokenGenerator>,
    ) -> Self {
        let scheduling = &config.scheduling;
        let availability = Arc::new(AvailabilityCalculator::new(Arc::clone(&store), scheduling));
        let conflicts = Arc::new(ConflictGuard::new(Arc::clone(&store)));
        let matcher = Arc::new(WaitlistMatcher::new(Arc::clone(&store), scheduling));
        let waitlist = Arc::new(WaitlistService::new(Arc::clone(&store)));
        let booking = AppointmentBookingService::new(
            Arc::clone(&store),
            Arc::clone(&availability),
            Arc::clone(&conflicts),
            tokens,
            Arc::clone(&matcher),
            scheduling,
        );

        Self {
            store,
            availability,
            conflicts,
            booking,
            matcher,
            waitlist,
        }
    }

    pub async fn get_available_slots(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        self.availability.compute_slots(tenant_id, service_id, date).await
    }

    pub async fn check_conflict(
        &self,
        tenant_id: Uuid,
        employee_id: Option<Uuid>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        self.conflicts
            .check_conflict(tenant_id, employee_id, start, end, exclude_appointment_id)
            .await
    }

    pub async fn create_appointment(
        &self,
        tenant_id: Uuid,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.booking.create_appointment(tenant_id, request).await
    }

    pub async fn reschedule_appointment(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.booking
            .reschedule_appointment(tenant_id, appointment_id, request)
            .await
    }

    pub async fn set_appointment_status(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<StatusChange, AppointmentError> {
        self.booking.set_status(tenant_id, appointment_id, status).await
    }

    pub async fn confirm_by_token(
        &self,
        tenant_slug: &str,
        token: &str,
    ) -> Result<TokenResponseOutcome, AppointmentError> {
        let tenant_id = self.resolve_tenant(tenant_slug).await?;
        self.booking
            .respond_by_token(tenant_id, token, CustomerResponse::Confirmed)
            .await
    }

    pub async fn decline_by_token(
        &self,
        tenant_slug: &str,
        token: &str,
    ) -> Result<TokenResponseOutcome, AppointmentError> {
        let tenant_id = self.resolve_tenant(tenant_slug).await?;
        self.booking
            .respond_by_token(tenant_id, token, CustomerResponse::Declined)
            .await
    }

    pub async fn find_waitlist_matches(
        &self,
        tenant_id: Uuid,
        slot: &FreedSlot,
    ) -> Result<Vec<WaitlistEntry>, AppointmentError> {
        Ok(self.matcher.find_matches(tenant_id, slot).await?)
    }

    pub async fn add_to_waitlist(
        &self,
        tenant_id: Uuid,
        request: AddToWaitlistRequest,
    ) -> Result<WaitlistEntry, AppointmentError> {
        Ok(self.waitlist.add_entry(tenant_id, request).await?)
    }

    pub async fn get_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.booking.get_appointment(tenant_id, appointment_id).await
    }

    pub async fn delete_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.booking.delete_appointment(tenant_id, appointment_id).await
    }

    pub async fn mark_reminder_sent(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.booking.mark_reminder_sent(tenant_id, appointment_id).await
    }

    pub async fn reset_reminder_sent(&self, tenant_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.booking.reset_reminder_sent(tenant_id, appointment_id).await
    }

    pub async fn list_due_reminders(
        &self,
        tenant_id: Uuid,
        now: NaiveDateTime,
        hours_ahead: Option<i64>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.booking.due_reminders(tenant_id, now, hours_ahead).await
    }

    async fn resolve_tenant(&self, tenant_slug: &str) -> Result<Uuid, AppointmentError> {
        self.store
            .get_tenant_by_slug(tenant_slug)
            .await?
            .map(|tenant| tenant.id)
            .ok_or(AppointmentError::TenantNotFound)
    }
}
