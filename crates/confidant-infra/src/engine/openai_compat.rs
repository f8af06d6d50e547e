//! OpenAI-compatible chat-completions adapter for the
//! [`CompletionEngine`] port.
//!
//! Speaks `POST {base}/v1/chat/completions` with bearer authentication.
//! The system prompt is folded in as a leading `system` message, which
//! is the shape every compatible upstream accepts. The request timeout
//! is the engine-call timeout the orchestrator relies on: a slow
//! upstream surfaces as [`EngineError::Timeout`], a normal per-turn
//! failure.
//!
//! The API key is wrapped in [`secrecy::SecretString`]; the struct does
//! not derive `Debug`, so the key can never leak through logging.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use confidant_core::engine::CompletionEngine;
use confidant_types::engine::{CompletionRequest, EngineError, MessageRole};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

/// HTTP adapter for any OpenAI-compatible completion endpoint.
pub struct OpenAiCompatEngine {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiCompatEngine {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn to_wire(request: &CompletionRequest) -> WireRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: MessageRole::System.to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));
        WireRequest {
            model: request.model.clone(),
            messages,
        }
    }
}

impl CompletionEngine for OpenAiCompatEngine {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EngineError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&Self::to_wire(request))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    EngineError::Timeout
                } else {
                    EngineError::Http(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: WireResponse = response
            .json()
            .await
            .map_err(|err| EngineError::Malformed(err.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Malformed("response carried no choices".to_string()))?;
        Ok(choice.message.content)
    }
}
