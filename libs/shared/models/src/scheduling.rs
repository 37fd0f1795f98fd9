// libs/shared/models/src/scheduling.rs
//
// Records the scheduling core reads and writes. Times of appointments are
// tenant wall-clock times; no time zone conversion happens inside the core.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::clock::{self, minutes_of_day};

// ==============================================================================
// TENANT, SERVICE, EMPLOYEE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub is_active: bool,
    /// Employees allowed to perform the service. Empty means everyone.
    #[serde(default)]
    pub employee_ids: Vec<Uuid>,
}

impl Service {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_performed_by(&self, employee_id: Uuid) -> bool {
        self.employee_ids.is_empty() || self.employee_ids.contains(&employee_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkHours {
    #[serde(with = "crate::clock::hh_mm")]
    pub start: NaiveTime,
    #[serde(with = "crate::clock::hh_mm")]
    pub end: NaiveTime,
}

impl WorkHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `[start, start + duration)` fits inside the working window.
    pub fn fits(&self, start: NaiveTime, duration_minutes: i64) -> bool {
        let offset = minutes_of_day(start);
        offset >= minutes_of_day(self.start) && offset + duration_minutes <= minutes_of_day(self.end)
    }
}

/// Weekly working hours keyed by weekday. A missing day means the employee
/// does not work that day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkSchedule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monday: Option<WorkHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<WorkHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<WorkHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thursday: Option<WorkHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friday: Option<WorkHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturday: Option<WorkHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunday: Option<WorkHours>,
}

impl WorkSchedule {
    pub fn hours_for(&self, weekday: Weekday) -> Option<&WorkHours> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn with_day(mut self, weekday: Weekday, hours: WorkHours) -> Self {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = Some(hours);
        self
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub work_schedule: WorkSchedule,
    #[serde(default)]
    pub location_id: Option<Uuid>,
}

impl Employee {
    /// Whether the interval lies inside this employee's hours for its start day.
    pub fn works_during(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if end <= start {
            return false;
        }
        match self.work_schedule.hours_for(start.date().weekday()) {
            Some(hours) => hours.fits(start.time(), (end - start).num_minutes()),
            None => false,
        }
    }
}

// ==============================================================================
// APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Canceled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Canceled,
        AppointmentStatus::NoShow,
    ];

    /// Canceled appointments release their employee's time.
    pub fn occupies_time(&self) -> bool {
        !matches!(self, AppointmentStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerResponse {
    Confirmed,
    Declined,
}

impl fmt::Display for CustomerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerResponse::Confirmed => write!(f, "confirmed"),
            CustomerResponse::Declined => write!(f, "declined"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub location_id: Option<Uuid>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Service price captured when the appointment was booked or rescheduled.
    pub price: f64,
    pub status: AppointmentStatus,
    pub customer_response: Option<CustomerResponse>,
    pub customer_confirmed_at: Option<DateTime<Utc>>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub confirmation_token: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Whether this row consumes capacity of `employee_id` inside `[start, end)`.
    ///
    /// Unassigned and canceled appointments never block anything.
    pub fn blocks(
        &self,
        employee_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> bool {
        if exclude_appointment_id == Some(self.id) {
            return false;
        }
        self.status.occupies_time()
            && self.employee_id == Some(employee_id)
            && intervals_overlap(self.start_time, self.end_time, start, end)
    }

    /// Whether this row and `other` may not coexist for the same tenant.
    pub fn clashes_with(&self, other: &Appointment) -> bool {
        match self.employee_id {
            Some(employee_id) if self.status.occupies_time() && self.tenant_id == other.tenant_id => {
                other.blocks(employee_id, self.start_time, self.end_time, Some(self.id))
            }
            _ => false,
        }
    }
}

/// Half-open overlap test: `[a_start, a_end)` and `[b_start, b_end)` share an instant.
pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

// ==============================================================================
// WAITLIST
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    Waiting,
    Notified,
    Booked,
    Expired,
    Canceled,
}

impl WaitlistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistStatus::Waiting => "waiting",
            WaitlistStatus::Notified => "notified",
            WaitlistStatus::Booked => "booked",
            WaitlistStatus::Expired => "expired",
            WaitlistStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for WaitlistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub preferred_date_from: NaiveDate,
    pub preferred_date_to: NaiveDate,
    #[serde(default, with = "crate::clock::hh_mm_option")]
    pub preferred_time_from: Option<NaiveTime>,
    #[serde(default, with = "crate::clock::hh_mm_option")]
    pub preferred_time_to: Option<NaiveTime>,
    pub priority: i32,
    pub status: WaitlistStatus,
    pub notification_count: i32,
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn contact(&self) -> CustomerContact {
        CustomerContact {
            name: self.customer_name.clone(),
            email: self.customer_email.clone(),
            phone: self.customer_phone.clone(),
        }
    }

    pub fn wants_date(&self, date: NaiveDate) -> bool {
        self.preferred_date_from <= date && date <= self.preferred_date_to
    }

    /// Entries without a time window accept any time. Bounds are inclusive.
    pub fn accepts_time(&self, time: NaiveTime) -> bool {
        let after_start = self.preferred_time_from.map_or(true, |from| time >= from);
        let before_end = self.preferred_time_to.map_or(true, |to| time <= to);
        after_start && before_end
    }

    pub fn accepts_employee(&self, employee_id: Option<Uuid>) -> bool {
        match (self.employee_id, employee_id) {
            (None, _) => true,
            (Some(preferred), Some(freed)) => preferred == freed,
            (Some(_), None) => false,
        }
    }

    /// A location preference only filters when the freed slot's location is known.
    pub fn accepts_location(&self, location_id: Option<Uuid>) -> bool {
        match (self.location_id, location_id) {
            (Some(preferred), Some(freed)) => preferred == freed,
            _ => true,
        }
    }
}

/// `"HH:MM"` rendering used for slot lists handed to callers.
pub fn slot_label(time: NaiveTime) -> String {
    clock::format_clock_time(time)
}
