//! Infrastructure adapters for Confidant.
//!
//! Concrete implementations of the ports defined in `confidant-core`:
//! a JSON flat-file document store, an OpenAI-compatible HTTP
//! completion-engine adapter, a logging development transport, and the
//! `config.toml` loader.

pub mod config;
pub mod engine;
pub mod store;
pub mod transport;
