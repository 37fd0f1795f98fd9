// libs/shared/database/src/store.rs
//
// The relational store seen by the scheduling core. Every call carries the
// tenant id, and implementations must include it in every predicate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::{
    Appointment, Employee, Service, Tenant, WaitlistEntry, WaitlistStatus,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The write would overlap another active appointment of the same employee.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("confirmation token already in use")]
    DuplicateToken,
    /// The row changed after it was read; the caller must re-read it.
    #[error("stale write: {0}")]
    Stale(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn get_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>>;

    async fn get_service(&self, tenant_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>>;
    async fn get_employee(&self, tenant_id: Uuid, employee_id: Uuid) -> StoreResult<Option<Employee>>;
    /// Active employees in a stable order (creation order).
    async fn list_active_employees(&self, tenant_id: Uuid) -> StoreResult<Vec<Employee>>;

    /// Non-canceled appointments of `employee_id` overlapping `[from, to)`, by start time.
    async fn list_blocking_appointments(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;

    async fn get_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn find_appointment_by_token(&self, tenant_id: Uuid, token: &str) -> StoreResult<Option<Appointment>>;

    /// Scheduled or confirmed appointments starting in `[from, to)` with no reminder sent yet.
    async fn list_reminder_candidates(
        &self,
        tenant_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;

    /// Inserts the row atomically with the overlap and token checks.
    ///
    /// Fails with [`StoreError::Conflict`] when an active appointment of the
    /// same employee overlaps, and [`StoreError::DuplicateToken`] when the
    /// confirmation token is taken.
    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<Appointment>;

    /// Replaces the row atomically with the overlap check, ignoring the row itself.
    ///
    /// The write only applies while the stored `updated_at` still equals
    /// `read_at`, the value the caller read; otherwise it fails with
    /// [`StoreError::Stale`] and nothing changes.
    async fn update_appointment(
        &self,
        appointment: Appointment,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Appointment>;

    async fn delete_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<()>;

    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry>;
    async fn get_waitlist_entry(&self, tenant_id: Uuid, entry_id: Uuid) -> StoreResult<Option<WaitlistEntry>>;
    async fn update_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry>;

    /// Entries ranked by priority (descending) then age (oldest first).
    async fn list_waitlist_entries(
        &self,
        tenant_id: Uuid,
        status: Option<WaitlistStatus>,
    ) -> StoreResult<Vec<WaitlistEntry>>;

    /// Waiting entries for `service_id` whose date range contains `date`,
    /// ranked like [`SchedulingStore::list_waitlist_entries`] and capped at `limit`.
    async fn list_waitlist_candidates(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<WaitlistEntry>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Ordering shared by every backend: priority high to low, then first come first served.
pub fn rank_waitlist(entries: &mut [WaitlistEntry]) {
    entries.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
