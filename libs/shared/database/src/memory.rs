//! In-memory implementation of the scheduling store.
//!
//! Used for local development and tests, and as the fallback when Supabase is
//! not configured. State is lost on restart.
//!
//! Appointment writes take the appointment map's write lock for the whole
//! check-then-write sequence, so the overlap re-check and the insert form one
//! serialized operation. Concurrent bookings of the same employee and time
//! therefore see each other and exactly one wins.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentStatus, Employee, Service, Tenant, WaitlistEntry, WaitlistStatus,
};

use crate::store::{rank_waitlist, SchedulingStore, StoreError, StoreResult};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tenants: Arc<RwLock<HashMap<Uuid, Tenant>>>,
    services: Arc<RwLock<HashMap<Uuid, Service>>>,
    /// Kept in insertion order so "first eligible employee" is deterministic.
    employees: Arc<RwLock<Vec<Employee>>>,
    appointments: Arc<RwLock<HashMap<Uuid, Appointment>>>,
    waitlist: Arc<RwLock<HashMap<Uuid, WaitlistEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Tenants, services and employees are managed outside the scheduling
    // core; these seed them for development and tests.

    pub async fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.id, tenant);
    }

    pub async fn upsert_service(&self, service: Service) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn upsert_employee(&self, employee: Employee) {
        let mut employees = self.employees.write().await;
        match employees.iter_mut().find(|existing| existing.id == employee.id) {
            Some(existing) => *existing = employee,
            None => employees.push(employee),
        }
    }

    pub async fn appointments_for_tenant(&self, tenant_id: Uuid) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| appointment.tenant_id == tenant_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|appointment| appointment.start_time);
        appointments
    }
}

fn check_writable(
    appointments: &HashMap<Uuid, Appointment>,
    candidate: &Appointment,
) -> StoreResult<()> {
    let token_taken = appointments.values().any(|other| {
        other.id != candidate.id && other.confirmation_token == candidate.confirmation_token
    });
    if token_taken {
        return Err(StoreError::DuplicateToken);
    }

    if let Some(clash) = appointments.values().find(|other| candidate.clashes_with(other)) {
        debug!(
            "Appointment {} overlaps {} for employee {:?}",
            candidate.id, clash.id, candidate.employee_id
        );
        return Err(StoreError::Conflict(format!(
            "employee is already booked from {} to {}",
            clash.start_time, clash.end_time
        )));
    }

    Ok(())
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn get_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        Ok(self
            .tenants
            .read()
            .await
            .values()
            .find(|tenant| tenant.slug == slug)
            .cloned())
    }

    async fn get_service(&self, tenant_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>> {
        Ok(self
            .services
            .read()
            .await
            .get(&service_id)
            .filter(|service| service.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_employee(&self, tenant_id: Uuid, employee_id: Uuid) -> StoreResult<Option<Employee>> {
        Ok(self
            .employees
            .read()
            .await
            .iter()
            .find(|employee| employee.id == employee_id && employee.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_active_employees(&self, tenant_id: Uuid) -> StoreResult<Vec<Employee>> {
        Ok(self
            .employees
            .read()
            .await
            .iter()
            .filter(|employee| employee.tenant_id == tenant_id && employee.is_active)
            .cloned()
            .collect())
    }

    async fn list_blocking_appointments(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let mut blocking: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| appointment.tenant_id == tenant_id)
            .filter(|appointment| appointment.blocks(employee_id, from, to, None))
            .cloned()
            .collect();
        blocking.sort_by_key(|appointment| appointment.start_time);
        Ok(blocking)
    }

    async fn get_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self
            .appointments
            .read()
            .await
            .get(&appointment_id)
            .filter(|appointment| appointment.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_appointment_by_token(&self, tenant_id: Uuid, token: &str) -> StoreResult<Option<Appointment>> {
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .find(|appointment| appointment.tenant_id == tenant_id && appointment.confirmation_token == token)
            .cloned())
    }

    async fn list_reminder_candidates(
        &self,
        tenant_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let mut due: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| appointment.tenant_id == tenant_id)
            .filter(|appointment| {
                matches!(
                    appointment.status,
                    AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
                )
            })
            .filter(|appointment| appointment.reminder_sent_at.is_none())
            .filter(|appointment| appointment.start_time >= from && appointment.start_time < to)
            .cloned()
            .collect();
        due.sort_by_key(|appointment| appointment.start_time);
        Ok(due)
    }

    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let mut appointments = self.appointments.write().await;

        if appointments.contains_key(&appointment.id) {
            return Err(StoreError::Unexpected(anyhow::anyhow!(
                "appointment {} already exists",
                appointment.id
            )));
        }
        check_writable(&appointments, &appointment)?;

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let mut appointments = self.appointments.write().await;

        let existing = appointments
            .get(&appointment.id)
            .filter(|existing| existing.tenant_id == appointment.tenant_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment.id)))?;
        if existing.updated_at != read_at {
            return Err(StoreError::Stale(format!(
                "appointment {} changed at {}",
                appointment.id, existing.updated_at
            )));
        }
        check_writable(&appointments, &appointment)?;

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<()> {
        let mut appointments = self.appointments.write().await;
        match appointments.get(&appointment_id) {
            Some(existing) if existing.tenant_id == tenant_id => {
                appointments.remove(&appointment_id);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("appointment {}", appointment_id))),
        }
    }

    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry> {
        self.waitlist.write().await.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_waitlist_entry(&self, tenant_id: Uuid, entry_id: Uuid) -> StoreResult<Option<WaitlistEntry>> {
        Ok(self
            .waitlist
            .read()
            .await
            .get(&entry_id)
            .filter(|entry| entry.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry> {
        let mut waitlist = self.waitlist.write().await;
        match waitlist.get_mut(&entry.id) {
            Some(existing) if existing.tenant_id == entry.tenant_id => {
                *existing = entry.clone();
                Ok(entry)
            }
            _ => Err(StoreError::NotFound(format!("waitlist entry {}", entry.id))),
        }
    }

    async fn list_waitlist_entries(
        &self,
        tenant_id: Uuid,
        status: Option<WaitlistStatus>,
    ) -> StoreResult<Vec<WaitlistEntry>> {
        let mut entries: Vec<WaitlistEntry> = self
            .waitlist
            .read()
            .await
            .values()
            .filter(|entry| entry.tenant_id == tenant_id)
            .filter(|entry| status.map_or(true, |status| entry.status == status))
            .cloned()
            .collect();
        rank_waitlist(&mut entries);
        Ok(entries)
    }

    async fn list_waitlist_candidates(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<WaitlistEntry>> {
        let mut entries: Vec<WaitlistEntry> = self
            .waitlist
            .read()
            .await
            .values()
            .filter(|entry| entry.tenant_id == tenant_id && entry.service_id == service_id)
            .filter(|entry| entry.status == WaitlistStatus::Waiting)
            .filter(|entry| entry.wants_date(date))
            .cloned()
            .collect();
        rank_waitlist(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
