//! CompletionEngine trait definition.
//!
//! The completion-engine adapter is an external collaborator: it turns a
//! list of role-tagged messages into one HTTP call and one string reply.
//! The adapter owns its own timeout (on the order of two minutes); a
//! timeout surfaces as a normal [`EngineError`], never a panic.
//! Implementations live in confidant-infra (e.g., `OpenAiCompatEngine`).

use confidant_types::engine::{CompletionRequest, EngineError};

/// Port for the remote text-completion engine.
pub trait CompletionEngine: Send + Sync {
    /// Send one request and receive the engine's full reply text.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String, EngineError>> + Send;
}
