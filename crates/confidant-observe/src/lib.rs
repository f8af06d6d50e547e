//! Observability setup for Confidant.

pub mod tracing_setup;
