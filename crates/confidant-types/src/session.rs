//! User session record and turn types for Confidant.
//!
//! A `UserSession` is the orchestrator's sole long-lived record per user:
//! quota balances, the append-only turn history, memory notes, context
//! overrides, and activity tracking. Sessions are persisted as part of
//! the root relay document (whole-document read/replace semantics).

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::memory::MemoryNote;

// Re-export MessageRole; turn roles and engine roles are the same alphabet.
pub use crate::engine::MessageRole;

/// An opaque reference to out-of-band binary content attached to a user
/// turn (the transport layer owns the bytes).
pub type AttachmentRef = String;

/// One role-tagged message in a user's history.
///
/// Turns are append-only: history ordering is monotonic by append order
/// and never reordered or mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
    /// References to out-of-band attachments (user turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    pub at: DateTime<FixedOffset>,
    /// Catalog key of the model that produced this turn (assistant turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Turn {
    /// Build a user turn without attachments.
    pub fn user(content: impl Into<String>, at: DateTime<FixedOffset>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            attachments: Vec::new(),
            at,
            model: None,
        }
    }

    /// Build an assistant turn tagged with the producing model.
    pub fn assistant(
        content: impl Into<String>,
        at: DateTime<FixedOffset>,
        model: Option<String>,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            at,
            model,
        }
    }
}

/// Per-user session record, keyed by user identifier.
///
/// Quota invariant: `premium_credits` and `fallback_uses` are reset to the
/// configured daily starting values exactly once per local calendar day,
/// on first access after `last_reset` falls behind today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub premium_credits: u32,
    pub fallback_uses: u32,
    pub last_reset: NaiveDate,
    /// Catalog key of the currently selected model.
    pub model: String,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub notes: Vec<MemoryNote>,
    #[serde(default)]
    pub token_budget_override: Option<u32>,
    #[serde(default)]
    pub round_limit_override: Option<u32>,
    #[serde(default)]
    pub last_activity: Option<DateTime<FixedOffset>>,
    /// Channel/target identifier of the user's most recent inbound message.
    #[serde(default)]
    pub last_channel: Option<String>,
    /// Local date of the last inactivity check-in sample for this user.
    #[serde(default)]
    pub last_checkin_date: Option<NaiveDate>,
}

impl UserSession {
    /// Create a fresh session with full daily balances.
    pub fn new(model: impl Into<String>, credits: u32, fallback_uses: u32, today: NaiveDate) -> Self {
        Self {
            premium_credits: credits,
            fallback_uses,
            last_reset: today,
            model: model.into(),
            history: Vec::new(),
            notes: Vec::new(),
            token_budget_override: None,
            round_limit_override: None,
            last_activity: None,
            last_channel: None,
            last_checkin_date: None,
        }
    }

    /// Total characters currently occupied by memory notes.
    pub fn notes_len(&self) -> usize {
        self.notes.iter().map(|n| n.text.chars().count()).sum()
    }
}
