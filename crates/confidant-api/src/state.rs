//! Shared application state for HTTP handlers.

use std::sync::Arc;

use confidant_core::processor::TurnProcessor;
use confidant_infra::engine::OpenAiCompatEngine;
use confidant_infra::store::JsonFileStore;
use confidant_infra::transport::LogTransport;

/// The concrete processor type the binary wires together.
pub type RelayProcessor = TurnProcessor<JsonFileStore, OpenAiCompatEngine, LogTransport>;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<RelayProcessor>,
}
