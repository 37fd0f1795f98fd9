use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use uuid::Uuid;

use shared_database::{InMemoryStore, SchedulingStore, StoreError};
use shared_models::{AppointmentStatus, Service, WaitlistStatus};
use shared_utils::test_utils::SchedulingFixtures as F;

fn monday() -> NaiveDate {
    F::date(2024, 6, 3)
}

async fn seeded() -> (InMemoryStore, Service, Uuid) {
    let store = InMemoryStore::new();
    let tenant = F::tenant("salon");
    let service = F::service(tenant.id, "Haircut", 45, 35.0);
    let employee = F::employee(tenant.id, "Anna", F::weekday_schedule((9, 0), (17, 0)));
    let employee_id = employee.id;

    store.insert_tenant(tenant).await;
    store.upsert_service(service.clone()).await;
    store.upsert_employee(employee).await;
    (store, service, employee_id)
}

#[tokio::test]
async fn test_overlapping_insert_is_rejected() {
    let (store, service, employee_id) = seeded().await;

    let first = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 0));
    store.insert_appointment(first).await.unwrap();

    let overlapping = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 30));
    assert_matches!(
        store.insert_appointment(overlapping).await,
        Err(StoreError::Conflict(_))
    );

    // Touching intervals are fine.
    let adjacent = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 45));
    assert!(store.insert_appointment(adjacent).await.is_ok());
}

#[tokio::test]
async fn test_canceled_rows_release_time_until_reactivated() {
    let (store, service, employee_id) = seeded().await;

    let mut first = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 0));
    first.status = AppointmentStatus::Canceled;
    let first = store.insert_appointment(first).await.unwrap();

    let replacement = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 0));
    store.insert_appointment(replacement).await.unwrap();

    let mut reactivated = first.clone();
    reactivated.status = AppointmentStatus::Scheduled;
    assert_matches!(
        store.update_appointment(reactivated, first.updated_at).await,
        Err(StoreError::Conflict(_))
    );
}

#[tokio::test]
async fn test_update_ignores_its_own_row() {
    let (store, service, employee_id) = seeded().await;

    let appointment = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 0));
    let mut moved = store.insert_appointment(appointment).await.unwrap();
    moved.start_time = F::at(monday(), 10, 15);
    moved.end_time = F::at(monday(), 11, 0);

    let read_at = moved.updated_at;
    let saved = store.update_appointment(moved, read_at).await.unwrap();
    assert_eq!(saved.start_time, F::at(monday(), 10, 15));
}

#[tokio::test]
async fn test_update_from_an_outdated_read_is_stale() {
    let (store, service, employee_id) = seeded().await;
    let appointment = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 0));
    let read = store.insert_appointment(appointment).await.unwrap();

    let mut rescheduled = read.clone();
    rescheduled.start_time = F::at(monday(), 14, 0);
    rescheduled.end_time = F::at(monday(), 14, 45);
    rescheduled.updated_at = read.updated_at + Duration::seconds(1);
    store.update_appointment(rescheduled, read.updated_at).await.unwrap();

    // A writer still holding the first read must not put 10:00 back
    let mut confirmed = read.clone();
    confirmed.status = AppointmentStatus::Confirmed;
    confirmed.updated_at = read.updated_at + Duration::seconds(2);
    assert_matches!(
        store.update_appointment(confirmed, read.updated_at).await,
        Err(StoreError::Stale(_))
    );

    let stored = store.get_appointment(service.tenant_id, read.id).await.unwrap().unwrap();
    assert_eq!(stored.start_time, F::at(monday(), 14, 0));
    assert_eq!(stored.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_unassigned_rows_never_conflict() {
    let (store, service, _) = seeded().await;

    for _ in 0..3 {
        let unassigned = F::appointment(&service, None, F::at(monday(), 10, 0));
        store.insert_appointment(unassigned).await.unwrap();
    }
    assert_eq!(store.appointments_for_tenant(service.tenant_id).await.len(), 3);
}

#[tokio::test]
async fn test_duplicate_confirmation_token_is_reported() {
    let (store, service, employee_id) = seeded().await;

    let first = F::appointment(&service, Some(employee_id), F::at(monday(), 9, 0));
    let mut second = F::appointment(&service, Some(employee_id), F::at(monday(), 14, 0));
    second.confirmation_token = first.confirmation_token.clone();

    store.insert_appointment(first).await.unwrap();
    assert_matches!(
        store.insert_appointment(second).await,
        Err(StoreError::DuplicateToken)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_for_same_slot_admit_exactly_one() {
    let (store, service, employee_id) = seeded().await;

    let attempts = (0..16).map(|_| {
        let store = store.clone();
        let appointment = F::appointment(&service, Some(employee_id), F::at(monday(), 11, 0));
        tokio::spawn(async move { store.insert_appointment(appointment).await })
    });

    let results = join_all(attempts).await;
    let succeeded = results
        .iter()
        .filter(|result| matches!(result, Ok(Ok(_))))
        .count();
    let conflicted = results
        .iter()
        .filter(|result| matches!(result, Ok(Err(StoreError::Conflict(_)))))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(conflicted, 15);
}

#[tokio::test]
async fn test_tenant_isolation() {
    let (store, service, employee_id) = seeded().await;
    let appointment = F::appointment(&service, Some(employee_id), F::at(monday(), 9, 0));
    let appointment = store.insert_appointment(appointment).await.unwrap();

    let other_tenant = Uuid::new_v4();
    assert!(store.get_appointment(other_tenant, appointment.id).await.unwrap().is_none());
    assert!(store.get_service(other_tenant, service.id).await.unwrap().is_none());
    assert!(store
        .find_appointment_by_token(other_tenant, &appointment.confirmation_token)
        .await
        .unwrap()
        .is_none());
    assert_matches!(
        store.delete_appointment(other_tenant, appointment.id).await,
        Err(StoreError::NotFound(_))
    );

    let mut hijacked = appointment.clone();
    hijacked.tenant_id = other_tenant;
    assert_matches!(
        store.update_appointment(hijacked, appointment.updated_at).await,
        Err(StoreError::NotFound(_))
    );
}

#[tokio::test]
async fn test_waitlist_candidates_are_ranked_and_capped() {
    let (store, service, _) = seeded().await;
    let tenant_id = service.tenant_id;

    let low = F::waitlist_entry(tenant_id, service.id, monday(), monday(), 1);
    let high = F::waitlist_entry(tenant_id, service.id, monday(), monday(), 5);
    let mut booked = F::waitlist_entry(tenant_id, service.id, monday(), monday(), 9);
    booked.status = WaitlistStatus::Booked;
    let out_of_range = F::waitlist_entry(tenant_id, service.id, F::date(2024, 7, 1), F::date(2024, 7, 2), 9);

    for entry in [low.clone(), high.clone(), booked, out_of_range] {
        store.insert_waitlist_entry(entry).await.unwrap();
    }

    let candidates = store
        .list_waitlist_candidates(tenant_id, service.id, monday(), 10)
        .await
        .unwrap();
    let ids: Vec<Uuid> = candidates.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![high.id, low.id]);

    let capped = store
        .list_waitlist_candidates(tenant_id, service.id, monday(), 1)
        .await
        .unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].id, high.id);
}

#[tokio::test]
async fn test_reminder_candidates_skip_sent_and_inactive() {
    let (store, service, employee_id) = seeded().await;
    let tenant_id = service.tenant_id;

    let due = F::appointment(&service, Some(employee_id), F::at(monday(), 9, 0));
    let mut sent = F::appointment(&service, Some(employee_id), F::at(monday(), 10, 0));
    sent.reminder_sent_at = Some(chrono::Utc::now());
    let mut completed = F::appointment(&service, Some(employee_id), F::at(monday(), 11, 0));
    completed.status = AppointmentStatus::Completed;
    let later = F::appointment(&service, Some(employee_id), F::at(F::date(2024, 6, 5), 9, 0));

    for appointment in [due.clone(), sent, completed, later] {
        store.insert_appointment(appointment).await.unwrap();
    }

    let reminders = store
        .list_reminder_candidates(tenant_id, F::at(monday(), 0, 0), F::at(F::date(2024, 6, 4), 0, 0))
        .await
        .unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].id, due.id);
}
