// libs/waitlist-cell/src/services/notify.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::{WaitlistEntry, WaitlistStatus};

use crate::models::{FreedSlot, OutboundNotification, SlotOffer, WaitlistError, WAITLIST_SLOT_TEMPLATE};
use crate::services::dispatch::NotificationDispatch;

/// Records that a waiting customer was offered a slot and hands the offer to
/// the dispatcher. Delivery runs in a detached task; its failures are logged
/// and never reach the caller.
pub struct WaitlistNotifier {
    store: Arc<dyn SchedulingStore>,
    dispatcher: Arc<dyn NotificationDispatch>,
}

impl WaitlistNotifier {
    pub fn new(store: Arc<dyn SchedulingStore>, dispatcher: Arc<dyn NotificationDispatch>) -> Self {
        Self { store, dispatcher }
    }

    #[instrument(skip(self, slot))]
    pub async fn notify_entry(
        &self,
        tenant_id: Uuid,
        entry_id: Uuid,
        slot: &FreedSlot,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut entry = self
            .store
            .get_waitlist_entry(tenant_id, entry_id)
            .await?
            .ok_or(WaitlistError::EntryNotFound)?;

        if !matches!(entry.status, WaitlistStatus::Waiting | WaitlistStatus::Notified) {
            return Err(WaitlistError::NotNotifiable { status: entry.status });
        }
        if entry.service_id != slot.service_id {
            return Err(WaitlistError::ValidationError(
                "Slot is for a different service than the waitlist entry".to_string(),
            ));
        }

        let service = self
            .store
            .get_service(tenant_id, slot.service_id)
            .await?
            .ok_or(WaitlistError::ServiceNotFound)?;

        let now = Utc::now();
        entry.status = WaitlistStatus::Notified;
        entry.notified_at = Some(now);
        entry.notification_count += 1;
        entry.updated_at = now;
        let entry = self.store.update_waitlist_entry(entry).await?;

        let notification = OutboundNotification {
            tenant_id,
            waitlist_entry_id: entry.id,
            template: WAITLIST_SLOT_TEMPLATE.to_string(),
            contact: entry.contact(),
            data: SlotOffer {
                service_id: service.id,
                service_name: service.name,
                date: slot.date,
                time: slot.time,
                employee_id: slot.employee_id,
                location_id: slot.location_id,
            },
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            let entry_id = notification.waitlist_entry_id;
            if let Err(e) = dispatcher.dispatch(notification).await {
                error!("Failed to deliver waitlist notification {} via {}: {:#}", entry_id, dispatcher.channel(), e);
            }
        });

        info!(
            "Waitlist entry {} notified ({} notifications so far)",
            entry.id, entry.notification_count
        );
        Ok(entry)
    }
}
