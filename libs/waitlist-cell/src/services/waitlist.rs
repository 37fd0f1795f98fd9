// libs/waitlist-cell/src/services/waitlist.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::{WaitlistEntry, WaitlistStatus};

use crate::models::{AddToWaitlistRequest, WaitlistError};

pub struct WaitlistService {
    store: Arc<dyn SchedulingStore>,
}

impl WaitlistService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Staff entry point: priority and customer link are taken from the request.
    #[instrument(skip(self, request), fields(service_id = %request.service_id))]
    pub async fn add_entry(
        &self,
        tenant_id: Uuid,
        request: AddToWaitlistRequest,
    ) -> Result<WaitlistEntry, WaitlistError> {
        validate_request(&request)?;

        let service_exists = self
            .store
            .get_service(tenant_id, request.service_id)
            .await?
            .is_some();
        if !service_exists {
            return Err(WaitlistError::ServiceNotFound);
        }

        let now = Utc::now();
        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            tenant_id,
            service_id: request.service_id,
            employee_id: request.employee_id,
            location_id: request.location_id,
            customer_id: request.customer_id,
            customer_name: request.customer_name.trim().to_string(),
            customer_email: non_blank(request.customer_email),
            customer_phone: non_blank(request.customer_phone),
            preferred_date_from: request.preferred_date_from,
            preferred_date_to: request.preferred_date_to,
            preferred_time_from: request.preferred_time_from,
            preferred_time_to: request.preferred_time_to,
            priority: request.priority.unwrap_or(0),
            status: WaitlistStatus::Waiting,
            notification_count: 0,
            notified_at: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let entry = self.store.insert_waitlist_entry(entry).await?;
        info!("Added waitlist entry {} for tenant {}", entry.id, tenant_id);
        Ok(entry)
    }

    /// Public form entry point. The tenant is resolved from its routing slug and
    /// customers cannot choose their own priority or customer link.
    pub async fn add_public_entry(
        &self,
        tenant_slug: &str,
        mut request: AddToWaitlistRequest,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let tenant = self
            .store
            .get_tenant_by_slug(tenant_slug)
            .await?
            .ok_or(WaitlistError::TenantNotFound)?;

        request.priority = None;
        request.customer_id = None;
        self.add_entry(tenant.id, request).await
    }

    pub async fn get_entry(&self, tenant_id: Uuid, entry_id: Uuid) -> Result<WaitlistEntry, WaitlistError> {
        self.store
            .get_waitlist_entry(tenant_id, entry_id)
            .await?
            .ok_or(WaitlistError::EntryNotFound)
    }

    pub async fn list_entries(
        &self,
        tenant_id: Uuid,
        status: Option<WaitlistStatus>,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        Ok(self.store.list_waitlist_entries(tenant_id, status).await?)
    }

    /// Staff status changes. `notified` is only reachable through the notify
    /// operation, which also records the notification.
    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        entry_id: Uuid,
        status: WaitlistStatus,
    ) -> Result<WaitlistEntry, WaitlistError> {
        if status == WaitlistStatus::Notified {
            return Err(WaitlistError::ValidationError(
                "Use the notify operation to mark an entry as notified".to_string(),
            ));
        }

        let mut entry = self.get_entry(tenant_id, entry_id).await?;
        if entry.status == status {
            debug!("Waitlist entry {} already {}", entry_id, status);
            return Ok(entry);
        }

        debug!("Waitlist entry {}: {} -> {}", entry_id, entry.status, status);
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(self.store.update_waitlist_entry(entry).await?)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn validate_request(request: &AddToWaitlistRequest) -> Result<(), WaitlistError> {
    if request.customer_name.trim().is_empty() {
        return Err(WaitlistError::ValidationError("Customer name is required".to_string()));
    }

    let has_email = request.customer_email.as_deref().is_some_and(|v| !v.trim().is_empty());
    let has_phone = request.customer_phone.as_deref().is_some_and(|v| !v.trim().is_empty());
    if !has_email && !has_phone {
        return Err(WaitlistError::ValidationError(
            "An email address or phone number is required".to_string(),
        ));
    }

    if request.preferred_date_from > request.preferred_date_to {
        return Err(WaitlistError::ValidationError(
            "preferred_date_from must not be after preferred_date_to".to_string(),
        ));
    }

    if let (Some(from), Some(to)) = (request.preferred_time_from, request.preferred_time_to) {
        if from > to {
            return Err(WaitlistError::ValidationError(
                "preferred_time_from must not be after preferred_time_to".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_database::InMemoryStore;
    use shared_utils::test_utils::SchedulingFixtures as F;

    fn request(service_id: Uuid) -> AddToWaitlistRequest {
        AddToWaitlistRequest {
            service_id,
            employee_id: None,
            location_id: None,
            customer_id: None,
            customer_name: "  Maria  ".to_string(),
            customer_email: Some("maria@example.com".to_string()),
            customer_phone: Some("   ".to_string()),
            preferred_date_from: F::date(2024, 6, 1),
            preferred_date_to: F::date(2024, 6, 10),
            preferred_time_from: None,
            preferred_time_to: None,
            priority: Some(4),
            notes: None,
        }
    }

    async fn setup() -> (WaitlistService, Uuid, Uuid) {
        let store = InMemoryStore::new();
        let tenant = F::tenant("salon");
        let service = F::service(tenant.id, "Haircut", 45, 35.0);
        let ids = (tenant.id, service.id);
        store.insert_tenant(tenant).await;
        store.upsert_service(service).await;
        (WaitlistService::new(Arc::new(store)), ids.0, ids.1)
    }

    #[tokio::test]
    async fn test_add_entry_normalises_contact() {
        let (service, tenant_id, service_id) = setup().await;

        let entry = service.add_entry(tenant_id, request(service_id)).await.unwrap();
        assert_eq!(entry.customer_name, "Maria");
        assert_eq!(entry.customer_phone, None);
        assert_eq!(entry.priority, 4);
        assert_eq!(entry.status, WaitlistStatus::Waiting);
        assert_eq!(entry.notification_count, 0);
    }

    #[tokio::test]
    async fn test_add_entry_validation() {
        let (service, tenant_id, service_id) = setup().await;

        let mut no_contact = request(service_id);
        no_contact.customer_email = None;
        no_contact.customer_phone = None;
        assert_matches!(
            service.add_entry(tenant_id, no_contact).await,
            Err(WaitlistError::ValidationError(_))
        );

        let mut reversed = request(service_id);
        reversed.preferred_date_from = F::date(2024, 6, 11);
        assert_matches!(
            service.add_entry(tenant_id, reversed).await,
            Err(WaitlistError::ValidationError(_))
        );

        assert_matches!(
            service.add_entry(tenant_id, request(Uuid::new_v4())).await,
            Err(WaitlistError::ServiceNotFound)
        );
        assert_matches!(
            service.add_entry(Uuid::new_v4(), request(service_id)).await,
            Err(WaitlistError::ServiceNotFound)
        );
    }

    #[tokio::test]
    async fn test_public_entries_cannot_choose_priority() {
        let (service, _, service_id) = setup().await;

        let entry = service.add_public_entry("salon", request(service_id)).await.unwrap();
        assert_eq!(entry.priority, 0);

        assert_matches!(
            service.add_public_entry("unknown", request(service_id)).await,
            Err(WaitlistError::TenantNotFound)
        );
    }

    #[tokio::test]
    async fn test_set_status_rejects_notified() {
        let (service, tenant_id, service_id) = setup().await;
        let entry = service.add_entry(tenant_id, request(service_id)).await.unwrap();

        assert_matches!(
            service.set_status(tenant_id, entry.id, WaitlistStatus::Notified).await,
            Err(WaitlistError::ValidationError(_))
        );

        let booked = service
            .set_status(tenant_id, entry.id, WaitlistStatus::Booked)
            .await
            .unwrap();
        assert_eq!(booked.status, WaitlistStatus::Booked);

        assert_matches!(
            service.set_status(Uuid::new_v4(), entry.id, WaitlistStatus::Canceled).await,
            Err(WaitlistError::EntryNotFound)
        );
    }
}
