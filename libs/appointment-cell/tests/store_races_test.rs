use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;

use appointment_cell::{AppointmentError, CreateAppointmentRequest, SchedulingService, TokenResponseOutcome};
use shared_database::{InMemoryStore, SchedulingStore, StoreError, StoreResult};
use shared_models::{
    Appointment, AppointmentStatus, CustomerResponse, Employee, Service, Tenant, WaitlistEntry,
    WaitlistStatus,
};
use shared_utils::test_utils::{SchedulingFixtures as F, TestConfig};

/// In-memory store with knobs for interleavings and failures the plain
/// store never produces on its own.
#[derive(Default)]
struct InstrumentedStore {
    inner: InMemoryStore,
    /// Token lookups wait here until the other request has read too.
    token_reads_gate: Option<Arc<Barrier>>,
    gated_reads: usize,
    token_reads: AtomicUsize,
    waitlist_down: bool,
    /// Appointment reads report an `updated_at` older than the stored one.
    stale_reads: bool,
}

#[async_trait]
impl SchedulingStore for InstrumentedStore {
    async fn get_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        self.inner.get_tenant_by_slug(slug).await
    }

    async fn get_service(&self, tenant_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>> {
        self.inner.get_service(tenant_id, service_id).await
    }

    async fn get_employee(&self, tenant_id: Uuid, employee_id: Uuid) -> StoreResult<Option<Employee>> {
        self.inner.get_employee(tenant_id, employee_id).await
    }

    async fn list_active_employees(&self, tenant_id: Uuid) -> StoreResult<Vec<Employee>> {
        self.inner.list_active_employees(tenant_id).await
    }

    async fn list_blocking_appointments(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        self.inner.list_blocking_appointments(tenant_id, employee_id, from, to).await
    }

    async fn get_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        let appointment = self.inner.get_appointment(tenant_id, appointment_id).await?;
        if !self.stale_reads {
            return Ok(appointment);
        }
        Ok(appointment.map(|mut appointment| {
            appointment.updated_at = appointment.updated_at - Duration::seconds(30);
            appointment
        }))
    }

    async fn find_appointment_by_token(&self, tenant_id: Uuid, token: &str) -> StoreResult<Option<Appointment>> {
        let appointment = self.inner.find_appointment_by_token(tenant_id, token).await?;
        let read = self.token_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.token_reads_gate {
            if read < self.gated_reads {
                gate.wait().await;
            }
        }
        Ok(appointment)
    }

    async fn list_reminder_candidates(
        &self,
        tenant_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        self.inner.list_reminder_candidates(tenant_id, from, to).await
    }

    async fn insert_appointment(&self, appointment: Appointment) -> StoreResult<Appointment> {
        self.inner.insert_appointment(appointment).await
    }

    async fn update_appointment(
        &self,
        appointment: Appointment,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Appointment> {
        self.inner.update_appointment(appointment, read_at).await
    }

    async fn delete_appointment(&self, tenant_id: Uuid, appointment_id: Uuid) -> StoreResult<()> {
        self.inner.delete_appointment(tenant_id, appointment_id).await
    }

    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry> {
        self.inner.insert_waitlist_entry(entry).await
    }

    async fn get_waitlist_entry(&self, tenant_id: Uuid, entry_id: Uuid) -> StoreResult<Option<WaitlistEntry>> {
        self.inner.get_waitlist_entry(tenant_id, entry_id).await
    }

    async fn update_waitlist_entry(&self, entry: WaitlistEntry) -> StoreResult<WaitlistEntry> {
        self.inner.update_waitlist_entry(entry).await
    }

    async fn list_waitlist_entries(
        &self,
        tenant_id: Uuid,
        status: Option<WaitlistStatus>,
    ) -> StoreResult<Vec<WaitlistEntry>> {
        self.inner.list_waitlist_entries(tenant_id, status).await
    }

    async fn list_waitlist_candidates(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        limit: usize,
    ) -> StoreResult<Vec<WaitlistEntry>> {
        if self.waitlist_down {
            return Err(StoreError::Unexpected(anyhow::anyhow!("waitlist table unavailable")));
        }
        self.inner.list_waitlist_candidates(tenant_id, service_id, date, limit).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

struct Fixture {
    scheduling: SchedulingService,
    tenant: Tenant,
    appointment: Appointment,
}

async fn book_one(store: InstrumentedStore) -> Fixture {
    let tenant = F::tenant("city-salon");
    let haircut = F::service(tenant.id, "Haircut", 45, 35.0);
    let anna = F::employee(tenant.id, "Anna", F::weekday_schedule((9, 0), (17, 0)));
    store.inner.insert_tenant(tenant.clone()).await;
    store.inner.upsert_service(haircut.clone()).await;
    store.inner.upsert_employee(anna.clone()).await;
    let monday = F::date(2024, 6, 3);
    store
        .inner
        .insert_waitlist_entry(F::waitlist_entry(tenant.id, haircut.id, monday, monday, 1))
        .await
        .unwrap();

    // Booking never looks up tokens, so a gate stays closed until the responses
    let shared: Arc<dyn SchedulingStore> = Arc::new(store);
    let scheduling = SchedulingService::new(shared, &TestConfig::default().to_app_config());
    let appointment = scheduling
        .create_appointment(
            tenant.id,
            CreateAppointmentRequest {
                customer_id: Uuid::new_v4(),
                service_id: haircut.id,
                employee_id: Some(anna.id),
                first_available: false,
                start_time: F::at(monday, 10, 0),
                location_id: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    Fixture { scheduling, tenant, appointment }
}

#[tokio::test]
async fn test_simultaneous_confirm_and_decline_apply_once() {
    let store = InstrumentedStore {
        token_reads_gate: Some(Arc::new(Barrier::new(2))),
        gated_reads: 2,
        ..Default::default()
    };
    let fixture = book_one(store).await;
    let token = fixture.appointment.confirmation_token.clone();

    // Both requests read the unanswered row before either writes
    let (confirmed, declined) = tokio::join!(
        fixture.scheduling.confirm_by_token("city-salon", &token),
        fixture.scheduling.decline_by_token("city-salon", &token),
    );
    let outcomes = [confirmed.unwrap(), declined.unwrap()];

    let applied: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            TokenResponseOutcome::Applied(change) => Some(change),
            _ => None,
        })
        .collect();
    assert_eq!(applied.len(), 1);
    let winner = applied[0].appointment.customer_response.unwrap();

    let loser = outcomes
        .iter()
        .find(|outcome| !matches!(outcome, TokenResponseOutcome::Applied(_)))
        .unwrap();
    assert_matches!(
        loser,
        TokenResponseOutcome::AlreadyResponded { customer_response, .. } if *customer_response == winner
    );

    let stored = fixture
        .scheduling
        .get_appointment(fixture.tenant.id, fixture.appointment.id)
        .await
        .unwrap();
    assert_eq!(stored.customer_response, Some(winner));
    let expected_status = match winner {
        CustomerResponse::Confirmed => AppointmentStatus::Confirmed,
        CustomerResponse::Declined => AppointmentStatus::Canceled,
    };
    assert_eq!(stored.status, expected_status);
}

#[tokio::test]
async fn test_staff_update_from_outdated_read_is_rejected() {
    let store = InstrumentedStore { stale_reads: true, ..Default::default() };
    let fixture = book_one(store).await;

    let result = fixture
        .scheduling
        .set_appointment_status(fixture.tenant.id, fixture.appointment.id, AppointmentStatus::Confirmed)
        .await;
    assert_matches!(result, Err(AppointmentError::ConcurrentModification));

    let result = fixture
        .scheduling
        .mark_reminder_sent(fixture.tenant.id, fixture.appointment.id)
        .await;
    assert_matches!(result, Err(AppointmentError::ConcurrentModification));
}

#[tokio::test]
async fn test_cancellation_survives_waitlist_outage() {
    let store = InstrumentedStore { waitlist_down: true, ..Default::default() };
    let fixture = book_one(store).await;

    let change = fixture
        .scheduling
        .set_appointment_status(fixture.tenant.id, fixture.appointment.id, AppointmentStatus::Canceled)
        .await
        .unwrap();

    assert_eq!(change.appointment.status, AppointmentStatus::Canceled);
    assert!(change.waitlist_matches.is_empty());
    assert!(change.waitlist_lookup_failed);
}

#[tokio::test]
async fn test_cancellation_with_waitlist_up_is_not_flagged() {
    let fixture = book_one(InstrumentedStore::default()).await;

    let change = fixture
        .scheduling
        .set_appointment_status(fixture.tenant.id, fixture.appointment.id, AppointmentStatus::Canceled)
        .await
        .unwrap();

    assert_eq!(change.waitlist_matches.len(), 1);
    assert!(!change.waitlist_lookup_failed);
}
