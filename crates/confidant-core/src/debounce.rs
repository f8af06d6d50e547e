//! Per-user debounce buffer for inbound message fragments.
//!
//! A burst of rapid-fire messages coalesces into one turn: every new
//! fragment pushes the user's deadline forward by the wait interval, and
//! the turn is dispatched only once the user pauses past the deadline.
//! There is no hard cap on burst duration.
//!
//! Backed by a `DashMap` keyed by user identifier so per-user entries
//! are owned independently rather than guarded by one global lock.

use chrono::{DateTime, Duration, FixedOffset};
use dashmap::DashMap;

use confidant_types::session::AttachmentRef;

/// One inbound message fragment awaiting debounce.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    pub attachments: Vec<AttachmentRef>,
    pub at: DateTime<FixedOffset>,
}

struct UserBuffer {
    fragments: Vec<Fragment>,
    deadline: DateTime<FixedOffset>,
    channel_id: String,
}

/// Per-user accumulator of freshly arrived fragments.
#[derive(Default)]
pub struct DebounceBuffer {
    inner: DashMap<String, UserBuffer>,
}

impl DebounceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and push the user's deadline to `now + wait`.
    ///
    /// The buffered channel always tracks the most recent fragment.
    pub fn append(
        &self,
        user_id: &str,
        channel_id: &str,
        fragment: Fragment,
        now: DateTime<FixedOffset>,
        wait: Duration,
    ) {
        let deadline = now + wait;
        let mut entry = self
            .inner
            .entry(user_id.to_string())
            .or_insert_with(|| UserBuffer {
                fragments: Vec::new(),
                deadline,
                channel_id: channel_id.to_string(),
            });
        entry.fragments.push(fragment);
        entry.deadline = deadline;
        entry.channel_id = channel_id.to_string();
    }

    /// Push an existing buffer's deadline further out (used when the
    /// turn-completion judge decides the user is mid-thought).
    pub fn postpone(&self, user_id: &str, now: DateTime<FixedOffset>, wait: Duration) {
        if let Some(mut entry) = self.inner.get_mut(user_id) {
            entry.deadline = now + wait;
        }
    }

    /// Users whose deadline has elapsed and who have at least one
    /// buffered fragment.
    pub fn due_users(&self, now: DateTime<FixedOffset>) -> Vec<String> {
        self.inner
            .iter()
            .filter(|entry| !entry.fragments.is_empty() && entry.deadline <= now)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Atomically remove and return the buffered fragments (arrival
    /// order) together with the buffered channel.
    pub fn drain(&self, user_id: &str) -> Option<(String, Vec<Fragment>)> {
        self.inner
            .remove(user_id)
            .map(|(_, buffer)| (buffer.channel_id, buffer.fragments))
    }

    /// Snapshot of the currently buffered fragments (for the judge).
    pub fn fragments_snapshot(&self, user_id: &str) -> Vec<Fragment> {
        self.inner
            .get(user_id)
            .map(|entry| entry.fragments.clone())
            .unwrap_or_default()
    }

    /// Whether the user currently has buffered fragments.
    pub fn has_pending(&self, user_id: &str) -> bool {
        self.inner
            .get(user_id)
            .is_some_and(|entry| !entry.fragments.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::at;

    fn fragment(text: &str, now: DateTime<FixedOffset>) -> Fragment {
        Fragment {
            text: text.to_string(),
            attachments: Vec::new(),
            at: now,
        }
    }

    #[test]
    fn test_fragments_coalesce_until_pause() {
        let buffer = DebounceBuffer::new();
        let t0 = at(2026, 3, 1, 12, 0, 0);
        let wait = Duration::seconds(5);

        buffer.append("u1", "c1", fragment("one", t0), t0, wait);
        buffer.append("u1", "c1", fragment("two", t0 + Duration::seconds(3)), t0 + Duration::seconds(3), wait);

        // 4 seconds after the first fragment the deadline has been pushed
        // to t0+8s, so nothing is due yet.
        assert!(buffer.due_users(t0 + Duration::seconds(4)).is_empty());
        // Once the user pauses past the last deadline, the burst is due.
        let due = buffer.due_users(t0 + Duration::seconds(8));
        assert_eq!(due, vec!["u1".to_string()]);

        let (channel, fragments) = buffer.drain("u1").unwrap();
        assert_eq!(channel, "c1");
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(!buffer.has_pending("u1"));
    }

    #[test]
    fn test_drain_clears_buffer() {
        let buffer = DebounceBuffer::new();
        let t0 = at(2026, 3, 1, 12, 0, 0);
        buffer.append("u1", "c1", fragment("hi", t0), t0, Duration::seconds(5));
        assert!(buffer.drain("u1").is_some());
        assert!(buffer.drain("u1").is_none());
    }

    #[test]
    fn test_postpone_pushes_deadline() {
        let buffer = DebounceBuffer::new();
        let t0 = at(2026, 3, 1, 12, 0, 0);
        buffer.append("u1", "c1", fragment("so then", t0), t0, Duration::seconds(5));
        buffer.postpone("u1", t0, Duration::seconds(30));

        assert!(buffer.due_users(t0 + Duration::seconds(6)).is_empty());
        assert_eq!(buffer.due_users(t0 + Duration::seconds(30)).len(), 1);
    }

    #[test]
    fn test_channel_tracks_latest_fragment() {
        let buffer = DebounceBuffer::new();
        let t0 = at(2026, 3, 1, 12, 0, 0);
        buffer.append("u1", "c1", fragment("a", t0), t0, Duration::seconds(5));
        buffer.append("u1", "c2", fragment("b", t0), t0, Duration::seconds(5));
        let (channel, _) = buffer.drain("u1").unwrap();
        assert_eq!(channel, "c2");
    }

    #[test]
    fn test_users_are_independent() {
        let buffer = DebounceBuffer::new();
        let t0 = at(2026, 3, 1, 12, 0, 0);
        buffer.append("u1", "c1", fragment("a", t0), t0, Duration::seconds(5));
        buffer.append("u2", "c2", fragment("b", t0), t0, Duration::seconds(10));

        let due = buffer.due_users(t0 + Duration::seconds(6));
        assert_eq!(due, vec!["u1".to_string()]);
    }
}
