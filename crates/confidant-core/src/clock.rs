//! Injectable wall clock.
//!
//! All orchestration time flows through [`Clock`] so deadlines, daily
//! resets, and scan decisions are deterministic under test. Times are
//! carried in the relay's local fixed offset; "calendar day" always
//! means a local date.

use chrono::{DateTime, FixedOffset, Utc};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System clock pinned to a fixed local offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}
