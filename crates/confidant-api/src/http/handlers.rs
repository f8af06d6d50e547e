//! HTTP handlers: health check and the inbound delivery callback.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

/// GET /health - liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Payload the transport layer posts when a user message arrives.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// POST /inbound - accept one message fragment for debouncing.
///
/// Returns 202 immediately; the turn is dispatched by the proactive
/// scheduler once the user's debounce deadline elapses.
pub async fn inbound(
    State(state): State<AppState>,
    Json(payload): Json<InboundMessage>,
) -> StatusCode {
    state
        .processor
        .handle_fragment(
            &payload.user_id,
            &payload.channel_id,
            payload.text,
            payload.attachments,
        )
        .await;
    StatusCode::ACCEPTED
}
