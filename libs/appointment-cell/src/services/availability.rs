// libs/appointment-cell/src/services/availability.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, instrument};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::clock::{minutes_of_day, time_from_minutes};
use shared_models::{intervals_overlap, slot_label, weekday_name, Appointment, Employee, Service, WorkHours};

use crate::models::AppointmentError;

pub struct AvailabilityCalculator {
    store: Arc<dyn SchedulingStore>,
    grid_minutes: i64,
}

impl AvailabilityCalculator {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulingConfig) -> Self {
        Self {
            store,
            grid_minutes: config.slot_grid_minutes.max(1),
        }
    }

    /// Bookable start times on `date`, as `"HH:MM"` strings.
    ///
    /// A time is offered when at least one eligible employee is working and
    /// free for the whole service duration. The result can be stale by the
    /// time a booking arrives.
    #[instrument(skip(self))]
    pub async fn compute_slots(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        let service = self.active_service(tenant_id, service_id).await?;
        let employees = self.eligible_employees(tenant_id, &service).await?;

        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + Duration::days(1);
        let duration = i64::from(service.duration_minutes);

        let mut offered = BTreeSet::new();
        for employee in &employees {
            let Some(hours) = employee.work_schedule.hours_for(date.weekday()) else {
                continue;
            };

            let booked = self
                .store
                .list_blocking_appointments(tenant_id, employee.id, day_start, day_end)
                .await?;
            let free = free_starts(date, candidate_starts(hours, duration, self.grid_minutes), duration, &booked);

            debug!(
                "Employee {} has {} free slot(s) on {}",
                employee.id,
                free.len(),
                weekday_name(date.weekday())
            );
            offered.extend(free);
        }

        Ok(offered.into_iter().map(slot_label).collect())
    }

    pub async fn active_service(&self, tenant_id: Uuid, service_id: Uuid) -> Result<Service, AppointmentError> {
        let service = self
            .store
            .get_service(tenant_id, service_id)
            .await?
            .ok_or(AppointmentError::ServiceNotFound)?;

        if !service.is_active {
            return Err(AppointmentError::ServiceInactive);
        }
        if service.duration_minutes <= 0 {
            return Err(AppointmentError::ValidationError(
                "Service duration must be positive".to_string(),
            ));
        }
        Ok(service)
    }

    /// Active employees allowed to perform the service, in store order.
    pub async fn eligible_employees(
        &self,
        tenant_id: Uuid,
        service: &Service,
    ) -> Result<Vec<Employee>, AppointmentError> {
        Ok(self
            .store
            .list_active_employees(tenant_id)
            .await?
            .into_iter()
            .filter(|employee| service.is_performed_by(employee.id))
            .collect())
    }
}

/// Grid-aligned start times from `hours.start` whose full duration fits before `hours.end`.
pub fn candidate_starts(hours: &WorkHours, duration_minutes: i64, grid_minutes: i64) -> Vec<NaiveTime> {
    if duration_minutes <= 0 || grid_minutes <= 0 {
        return Vec::new();
    }

    let open = minutes_of_day(hours.start);
    let close = minutes_of_day(hours.end);

    let mut starts = Vec::new();
    let mut offset = open;
    while offset + duration_minutes <= close {
        if let Some(time) = time_from_minutes(offset) {
            starts.push(time);
        }
        offset += grid_minutes;
    }
    starts
}

/// Drops candidates whose `[start, start + duration)` overlaps a booked interval.
pub fn free_starts(
    date: NaiveDate,
    candidates: Vec<NaiveTime>,
    duration_minutes: i64,
    booked: &[Appointment],
) -> Vec<NaiveTime> {
    candidates
        .into_iter()
        .filter(|time| {
            let start: NaiveDateTime = date.and_time(*time);
            let end = start + Duration::minutes(duration_minutes);
            !booked.iter().any(|existing| {
                existing.status.occupies_time()
                    && intervals_overlap(existing.start_time, existing.end_time, start, end)
            })
        })
        .collect()
}
