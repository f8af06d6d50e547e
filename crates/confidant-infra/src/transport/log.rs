//! Development transport that logs outbound messages instead of
//! delivering them. Stands in for the real message-transport layer
//! while the relay runs locally.

use confidant_core::transport::Transport;
use confidant_types::error::TransportError;

/// Transport that writes every outbound message to the log.
pub struct LogTransport;

impl Transport for LogTransport {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        tracing::info!(channel = channel_id, message = text, "outbound message");
        Ok(())
    }
}
