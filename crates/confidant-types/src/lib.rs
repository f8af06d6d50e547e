//! Shared domain types for Confidant.
//!
//! This crate holds the serde data model exchanged between the
//! orchestration engine (`confidant-core`) and its adapters
//! (`confidant-infra`, `confidant-api`): user sessions, turns, memory
//! notes, schedule entries, engine request shapes, configuration, and
//! the error enums used at the port boundaries.

pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod schedule;
pub mod session;
pub mod store;
