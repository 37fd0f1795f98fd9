// libs/waitlist-cell/src/services/matching.rs
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::SchedulingStore;
use shared_models::WaitlistEntry;

use crate::models::{FreedSlot, WaitlistError};

/// Finds waiting customers for a slot released by a cancellation.
///
/// The store returns waiting entries for the service whose date range covers
/// the freed date, already ranked by priority (high first) and age (oldest
/// first). The matcher fetches `candidate_window` of them, drops the ones
/// whose time, employee or location preference rules the slot out, and keeps
/// the first `match_limit`. It never mutates entries; notifying is a separate
/// step.
pub struct WaitlistMatcher {
    store: Arc<dyn SchedulingStore>,
    match_limit: usize,
    candidate_window: usize,
}

impl WaitlistMatcher {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &SchedulingConfig) -> Self {
        Self {
            store,
            match_limit: config.waitlist_match_limit,
            candidate_window: config.waitlist_candidate_window,
        }
    }

    #[instrument(skip(self, slot), fields(service_id = %slot.service_id, date = %slot.date))]
    pub async fn find_matches(
        &self,
        tenant_id: Uuid,
        slot: &FreedSlot,
    ) -> Result<Vec<WaitlistEntry>, WaitlistError> {
        let window = self.candidate_window.max(self.match_limit);
        let candidates = self
            .store
            .list_waitlist_candidates(tenant_id, slot.service_id, slot.date, window)
            .await?;

        let fetched = candidates.len();
        let matches = select_matches(candidates, slot, self.match_limit);
        debug!("{} of {} waitlist candidates match the freed slot", matches.len(), fetched);

        Ok(matches)
    }
}

/// Applies the per-entry preferences to ranked candidates, preserving order.
pub fn select_matches(
    ranked: Vec<WaitlistEntry>,
    slot: &FreedSlot,
    limit: usize,
) -> Vec<WaitlistEntry> {
    ranked
        .into_iter()
        .filter(|entry| entry.accepts_time(slot.time))
        .filter(|entry| entry.accepts_employee(slot.employee_id))
        .filter(|entry| entry.accepts_location(slot.location_id))
        .take(limit)
        .collect()
}
