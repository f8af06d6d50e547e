//! Pending follow-up ("chase") table.
//!
//! At most one follow-up is armed per user. Arming replaces any previous
//! entry; any new user fragment cancels it. Entries live in memory only:
//! losing an armed chase across a restart is an accepted non-goal.

use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;

use confidant_types::schedule::PendingFollowUp;

/// Keyed table of armed follow-ups, one slot per user.
#[derive(Default)]
pub struct ChaseTable {
    inner: DashMap<String, PendingFollowUp>,
}

impl ChaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a follow-up for a user, replacing any existing one.
    pub fn arm(&self, user_id: &str, pending: PendingFollowUp) {
        self.inner.insert(user_id.to_string(), pending);
    }

    /// Cancel and return the user's armed follow-up, if any.
    pub fn cancel(&self, user_id: &str) -> Option<PendingFollowUp> {
        self.inner.remove(user_id).map(|(_, pending)| pending)
    }

    /// Whether the user currently has an armed follow-up.
    pub fn is_armed(&self, user_id: &str) -> bool {
        self.inner.contains_key(user_id)
    }

    /// Atomically remove and return every follow-up whose due time has
    /// passed.
    pub fn take_due(&self, now: DateTime<FixedOffset>) -> Vec<(String, PendingFollowUp)> {
        let due_ids: Vec<String> = self
            .inner
            .iter()
            .filter(|entry| entry.due_at <= now)
            .map(|entry| entry.key().clone())
            .collect();

        due_ids
            .into_iter()
            .filter_map(|user_id| {
                self.inner
                    .remove_if(&user_id, |_, pending| pending.due_at <= now)
                    .map(|(id, pending)| (id, pending))
            })
            .collect()
    }
}
