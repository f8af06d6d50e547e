//! Session orchestration engine for Confidant.
//!
//! This crate defines the "ports" (traits) the infrastructure layer
//! implements -- durable store, completion engine, transport, clock,
//! randomness -- and the orchestration logic built on top of them:
//! debounce buffering, context window building, directive parsing,
//! quota gating, turn processing, and the proactive scheduler. It
//! depends only on `confidant-types`, never on `confidant-infra` or any
//! HTTP/storage crate.

pub mod chance;
pub mod chase;
pub mod clock;
pub mod context;
pub mod debounce;
pub mod directive;
pub mod engine;
pub mod judge;
pub mod proactive;
pub mod processor;
pub mod prompt;
pub mod quota;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testkit;
