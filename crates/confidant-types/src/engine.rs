//! Completion-engine request types for Confidant.
//!
//! These model the data handed to the external completion-engine adapter:
//! a list of role-tagged messages plus an optional system prompt, and the
//! error taxonomy an adapter can surface back to the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an engine conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single role-tagged message sent to the completion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Request to the completion engine for one reply.
///
/// `model` is the upstream model string (not the catalog key). The system
/// prompt is kept separate; adapters fold it into whatever shape their
/// wire format expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<EngineMessage>,
}

/// Errors surfaced by a completion-engine adapter.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The HTTP request could not be completed (connect, DNS, TLS).
    #[error("engine request failed: {0}")]
    Http(String),

    /// The engine answered with a non-success status.
    #[error("engine returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The call exceeded the adapter's timeout.
    #[error("engine call timed out")]
    Timeout,

    /// The engine's response body did not have the expected shape.
    #[error("malformed engine response: {0}")]
    Malformed(String),
}
