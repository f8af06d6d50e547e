//! Transport trait definition.
//!
//! The message-transport layer (delivering outbound messages to the
//! user's channel) is an external collaborator. The orchestrator only
//! needs to hand it one text at a time; pacing between fragments of a
//! multi-part reply is the turn processor's job.

use confidant_types::error::TransportError;

/// Port for outbound message delivery.
pub trait Transport: Send + Sync {
    /// Deliver one message to a channel/target.
    fn send_text(
        &self,
        channel_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
