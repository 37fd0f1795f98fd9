// libs/shared/database/src/postgrest.rs
//
// Supabase (PostgREST) backed scheduling store. Double-booking protection is
// enforced by the database itself: see `sql/scheduling.sql` for the exclusion
// constraint on (employee_id, tsrange(start_time, end_time)) and the unique
// index on confirmation_token. Conflicting writes come back as HTTP 409 with
// SQLSTATE 23P01 / 23505 and are mapped to typed store errors here.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{Appointment, Employee, Service, Tenant, WaitlistEntry, WaitlistStatus};

use crate::store::{SchedulingStore, StoreError, StoreResult};
use crate::supabase::{PostgrestError, SupabaseClient};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct SupabaseSchedulingStore {
    supabase: Arc<SupabaseClient>,
    service_role_key: String,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, service_role_key: impl Into<String>) -> Self {
        Self {
            supabase,
            service_role_key: service_role_key.into(),
        }
    }

    async fn select<T>(&self, path: &str) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.supabase
            .request::<Vec<T>>(Method::GET, path, Some(&self.service_role_key), None)
            .await
            .map_err(map_store_error)
    }

    async fn select_one<T>(&self, path: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self.select::<T>(path).await?.into_iter().next())
    }

    async fn write<T>(&self, method: Method, path: &str, body: Option<Value>) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.supabase
            .request_with_headers::<Vec<T>>(
                method,
                path,
                Some(&self.service_role_key),
                body,
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(map_store_error)
    }
}

fn map_store_error(error: anyhow::Error) -> StoreError {
    if let Some(api_error) = error.downcast_ref::<PostgrestError>() {
        if api_error.has_code(PostgrestError::EXCLUSION_VIOLATION) {
            warn!("Store rejected overlapping appointment: {}", api_error.message);
            return StoreError::Conflict(api_error.message.clone());
        }
        if api_error.has_code(PostgrestError::UNIQUE_VIOLATION)
            && api_error.message.contains("confirmation_token")
        {
            return StoreError::DuplicateToken;
        }
    }
    StoreError::Unexpected(error)
}

fn timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn to_body<T: serde::Serialize>(value: &T) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Unexpected(e.into()))
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn get_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        let path = format!(
            "/rest/v1/tenants?slug=eq.{}&limit=1",
            urlencoding::encode(slug)
        );
        self.select_one(&path).await
    }

    async fn get_service(&self, tenant_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>> {
        let path = format!(
            "/rest/v1/services?tenant_id=eq.{}&id=eq.{}&limit=1",
            tenant_id, service_id
        );
        self.select_one(&path).await
    }

    async fn get_employee(&self, tenant_id: Uuid, employee_id: Uuid) -> StoreResult<Option<Employee>> {
        let path = format!(
            "/rest/v1/employees?tenant_id=eq.{}&id=eq.{}&limit=1",
            tenant_id, employee_id
        );
        self.select_one(&path).await
    }

    async fn list_active_employees(&self, tenant_id: Uuid) -> StoreResult<Vec<Employee>> {
        let path = format!(
            "/rest/v1/employees?tenant_id=eq.{}&is_active=eq.true&order=created_at.asc",
            tenant_id
        );
        self.select(&path).await
    }

    async fn list_blocking_appointments(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let query_parts = [
            format!("tenant_id=eq.{}", tenant_id),
            format!("employee_id=eq.{}", employee_id),
            "status=neq.canceled".to_string(),
            format!("start_time=lt.{}", timestamp(to)),
            format!("end_time=gt.{}", timestamp(from)),
        ];
        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );
        self.select(&path).await
    }

    async fn get_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?tenant_id=eq.{}&id=eq.{}&limit=1",
            tenant_id, appointment_id
        );
        self.select_one(&path).await
    }

    async fn find_appointment_by_token(&self, tenant_id: Uuid, token: &str) -> StoreResult<Option<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?tenant_id=eq.{}&confirmation_token=eq.{}&limit=1",
            tenant_id,
            urlencoding::encode(token)
        );
        self.select_one(&path).await
    }

    async fn list_reminder_candidates(
        &self,
        tenant_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let query_parts = [
            format!("tenant_id=eq.{}", tenant_id),
            "status=in.(scheduled,confirmed)".to_string(),
            "reminder_sent_at=is.null".to_string(),
            format!("start_time=gte.{}", timestamp(from)),
            format!("start_time=lt.{}", timestamp(to)),
        ];
        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );
        self.select(&path).await
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let body = to_body(&appointment)?;
        let rows: Vec<Appointment> = self
            .write(Method::POST, "/rest/v1/appointments", Some(body))
            .await?;

        rows.into_iter().next().ok_or_else(|| {
            StoreError::Unexpected(anyhow::anyhow!("appointment insert returned no rows"))
        })
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn update_appointment(
        &self,
        appointment: Appointment,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        let read_at = read_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let path = format!(
            "/rest/v1/appointments?tenant_id=eq.{}&id=eq.{}&updated_at=eq.{}",
            appointment.tenant_id,
            appointment.id,
            urlencoding::encode(&read_at)
        );
        let body = to_body(&appointment)?;
        let rows: Vec<Appointment> = self.write(Method::PATCH, &path, Some(body)).await?;

        if let Some(saved) = rows.into_iter().next() {
            return Ok(saved);
        }

        // No row matched: either it is gone or someone wrote it since it was read
        match self.get_appointment(appointment.tenant_id, appointment.id).await? {
            Some(current) => {
                warn!(
                    "Appointment {} changed at {} after being read at {}",
                    appointment.id, current.updated_at, read_at
                );
                Err(StoreError::Stale(format!("appointment {}", appointment.id)))
            }
            None => Err(StoreError::NotFound(format!("appointment {}", appointment.id))),
        }
    }

    async fn delete_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<()> {
        let path = format!(
            "/rest/v1/appointments?tenant_id=eq.{}&id=eq.{}",
            tenant_id, appointment_id
        );
        let rows: Vec<Value> = self.write(Method::DELETE, &path, None).await?;

        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("appointment {}", appointment_id)));
        }
        debug!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry> {
        let body = to_body(&entry)?;
        let rows: Vec<WaitlistEntry> = self
            .write(Method::POST, "/rest/v1/waitlist_entries", Some(body))
            .await?;

        rows.into_iter().next().ok_or_else(|| {
            StoreError::Unexpected(anyhow::anyhow!("waitlist insert returned no rows"))
        })
    }

    async fn get_waitlist_entry(&self, tenant_id: Uuid, entry_id: Uuid) -> StoreResult<Option<WaitlistEntry>> {
        let path = format!(
            "/rest/v1/waitlist_entries?tenant_id=eq.{}&id=eq.{}&limit=1",
            tenant_id, entry_id
        );
        self.select_one(&path).await
    }

    async fn update_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry> {
        let path = format!(
            "/rest/v1/waitlist_entries?tenant_id=eq.{}&id=eq.{}",
            entry.tenant_id, entry.id
        );
        let body = to_body(&entry)?;
        let rows: Vec<WaitlistEntry> = self.write(Method::PATCH, &path, Some(body)).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("waitlist entry {}", entry.id)))
    }

    async fn list_waitlist_entries(
        &self,
        tenant_id: Uuid,
        status: Option<WaitlistStatus>,
    ) -> StoreResult<Vec<WaitlistEntry>> {
        let mut query_parts = vec![format!("tenant_id=eq.{}", tenant_id)];
        if let Some(status) = status {
            query_parts.push(format!("status=eq.{}", status));
        }
        let path = format!(
            "/rest/v1/waitlist_entries?{}&order=priority.desc,created_at.asc",
            query_parts.join("&")
        );
        self.select(&path).await
    }

    async fn list_waitlist_candidates(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<WaitlistEntry>> {
        let query_parts = [
            format!("tenant_id=eq.{}", tenant_id),
            format!("service_id=eq.{}", service_id),
            "status=eq.waiting".to_string(),
            format!("preferred_date_from=lte.{}", date),
            format!("preferred_date_to=gte.{}", date),
        ];
        let path = format!(
            "/rest/v1/waitlist_entries?{}&order=priority.desc,created_at.asc&limit={}",
            query_parts.join("&"),
            limit
        );
        self.select(&path).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.select::<Value>("/rest/v1/tenants?select=id&limit=1")
            .await
            .map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
