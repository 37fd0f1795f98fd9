use std::sync::Arc;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig, StoreBackend};
use shared_models::auth::User;
use shared_models::{
    Appointment, AppointmentStatus, Employee, Service, Tenant, WaitlistEntry, WaitlistStatus,
    WorkHours, WorkSchedule,
};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub scheduling: SchedulingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl TestConfig {
    /// Points the Supabase client at a mock server.
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            store_backend: StoreBackend::Memory,
            server_port: 0,
            notification_webhook_url: None,
            scheduling: self.scheduling.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub tenant_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "staff".to_string(),
            tenant_id: Some(Uuid::new_v4()),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str, tenant_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            tenant_id,
        }
    }

    pub fn staff(email: &str, tenant_id: Uuid) -> Self {
        Self::new(email, "staff", Some(tenant_id))
    }

    pub fn admin(email: &str, tenant_id: Uuid) -> Self {
        Self::new(email, "admin", Some(tenant_id))
    }

    /// An authenticated account that belongs to no tenant.
    pub fn without_tenant(email: &str) -> Self {
        Self::new(email, "authenticated", None)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            tenant_id: self.tenant_id,
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let app_metadata = match user.tenant_id {
            Some(tenant_id) => json!({ "tenant_id": tenant_id.to_string() }),
            None => json!({}),
        };

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": app_metadata,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }
}

/// Builders for the records the scheduling core reads.
pub struct SchedulingFixtures;

impl SchedulingFixtures {
    pub fn tenant(slug: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: format!("{} studio", slug),
            created_at: Utc::now(),
        }
    }

    pub fn service(tenant_id: Uuid, name: &str, duration_minutes: i32, price: f64) -> Service {
        Service {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            duration_minutes,
            price,
            is_active: true,
            employee_ids: Vec::new(),
        }
    }

    pub fn hours(start: (u32, u32), end: (u32, u32)) -> WorkHours {
        WorkHours::new(Self::time(start.0, start.1), Self::time(end.0, end.1))
    }

    /// Monday to Friday with the same hours.
    pub fn weekday_schedule(start: (u32, u32), end: (u32, u32)) -> WorkSchedule {
        [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .fold(WorkSchedule::default(), |schedule, day| {
                schedule.with_day(day, Self::hours(start, end))
            })
    }

    pub fn employee(tenant_id: Uuid, name: &str, schedule: WorkSchedule) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            is_active: true,
            work_schedule: schedule,
            location_id: None,
        }
    }

    pub fn appointment(
        service: &Service,
        employee_id: Option<Uuid>,
        start: NaiveDateTime,
    ) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            tenant_id: service.tenant_id,
            customer_id: Uuid::new_v4(),
            service_id: service.id,
            employee_id,
            location_id: None,
            start_time: start,
            end_time: start + service.duration(),
            price: service.price,
            status: AppointmentStatus::Scheduled,
            customer_response: None,
            customer_confirmed_at: None,
            reminder_sent_at: None,
            confirmation_token: Uuid::new_v4().simple().to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn waitlist_entry(
        tenant_id: Uuid,
        service_id: Uuid,
        date_from: NaiveDate,
        date_to: NaiveDate,
        priority: i32,
    ) -> WaitlistEntry {
        let now = Utc::now();
        WaitlistEntry {
            id: Uuid::new_v4(),
            tenant_id,
            service_id,
            employee_id: None,
            location_id: None,
            customer_id: None,
            customer_name: "Waiting Customer".to_string(),
            customer_email: Some("waiting@example.com".to_string()),
            customer_phone: None,
            preferred_date_from: date_from,
            preferred_date_to: date_to,
            preferred_time_from: None,
            preferred_time_to: None,
            priority,
            status: WaitlistStatus::Waiting,
            notification_count: 0,
            notified_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid clock time")
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
    }

    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        date.and_time(Self::time(hour, minute))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn tenant_response(tenant_id: Uuid, slug: &str) -> serde_json::Value {
        json!({
            "id": tenant_id,
            "slug": slug,
            "name": "Test Studio",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn service_response(tenant_id: Uuid, service_id: Uuid) -> serde_json::Value {
        json!({
            "id": service_id,
            "tenant_id": tenant_id,
            "name": "Haircut",
            "duration_minutes": 45,
            "price": 35.0,
            "is_active": true,
            "employee_ids": []
        })
    }

    pub fn employee_response(tenant_id: Uuid, employee_id: Uuid) -> serde_json::Value {
        json!({
            "id": employee_id,
            "tenant_id": tenant_id,
            "name": "Anna",
            "is_active": true,
            "location_id": null,
            "work_schedule": {
                "monday": { "start": "09:00", "end": "17:00" },
                "tuesday": { "start": "09:00", "end": "17:00" }
            }
        })
    }

    pub fn appointment_response(
        tenant_id: Uuid,
        employee_id: Option<Uuid>,
        start_time: &str,
        end_time: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "tenant_id": tenant_id,
            "customer_id": Uuid::new_v4(),
            "service_id": Uuid::new_v4(),
            "employee_id": employee_id,
            "location_id": null,
            "start_time": start_time,
            "end_time": end_time,
            "price": 35.0,
            "status": "scheduled",
            "customer_response": null,
            "customer_confirmed_at": null,
            "reminder_sent_at": null,
            "confirmation_token": "AbCdEfGhIjKlMnOpQrStUvWxYz012345",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn waitlist_entry_response(tenant_id: Uuid, service_id: Uuid, priority: i32) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "tenant_id": tenant_id,
            "service_id": service_id,
            "employee_id": null,
            "location_id": null,
            "customer_id": null,
            "customer_name": "Maria",
            "customer_email": "maria@example.com",
            "customer_phone": null,
            "preferred_date_from": "2024-06-01",
            "preferred_date_to": "2024-06-30",
            "preferred_time_from": "09:00",
            "preferred_time_to": "12:00",
            "priority": priority,
            "status": "waiting",
            "notification_count": 0,
            "notified_at": null,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    /// PostgREST error body for a failed statement.
    pub fn postgrest_error(code: &str, message: &str) -> serde_json::Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
