//! Schedule entries and pending follow-ups.
//!
//! Both are transient records that reference a user by identifier only
//! (a non-owning back-reference). Schedule entries survive restarts as
//! part of the relay document; pending follow-ups are in-memory only
//! (losing one across a restart is an accepted non-goal).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// What kind of future contact a schedule entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Fires unconditionally at the scheduled moment.
    Clock,
    /// Fires at the scheduled moment only if the user has been quiet for
    /// the recent-activity suppression window; otherwise re-checked on
    /// the next scan.
    InactivityDeferred,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Clock => write!(f, "clock"),
            ScheduleKind::InactivityDeferred => write!(f, "inactivity_deferred"),
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clock" => Ok(ScheduleKind::Clock),
            "inactivity_deferred" => Ok(ScheduleKind::InactivityDeferred),
            other => Err(format!("invalid schedule kind: '{other}'")),
        }
    }
}

/// A scheduled future unprompted contact.
///
/// Created by the directive parser from engine output (or by the
/// proactive scheduler re-arming itself). Deleted once it fires or once
/// its fire date has passed unfired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub kind: ScheduleKind,
    pub fire_on: NaiveDate,
    pub fire_at: NaiveTime,
    /// Free-text hint handed back to the engine when the entry fires.
    pub hint: String,
    pub user_id: String,
    pub channel_id: String,
}

impl ScheduleEntry {
    /// The absolute local fire moment of this entry.
    pub fn fire_moment(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        self.fire_on
            .and_time(self.fire_at)
            .and_local_timezone(offset)
            .single()
    }
}

/// A single delayed follow-up ("chase") armed by an assistant reply.
///
/// At most one per user; canceled and discarded if the user sends any
/// new message before it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFollowUp {
    pub text: String,
    pub due_at: DateTime<FixedOffset>,
    pub channel_id: String,
}
