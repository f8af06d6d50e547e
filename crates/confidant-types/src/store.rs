//! Persisted root document shape.
//!
//! The durable store is an abstract keyed-document store with
//! whole-document read/replace semantics. `RelayDocument` is the root
//! object: a map of user identifier to session record plus the flat
//! collection of schedule entries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::schedule::ScheduleEntry;
use crate::session::UserSession;

/// Root persisted object for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayDocument {
    #[serde(default)]
    pub users: HashMap<String, UserSession>,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}
