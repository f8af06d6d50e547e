//! Outbound transport implementations.

pub mod log;

pub use log::LogTransport;
