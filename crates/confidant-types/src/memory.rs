//! Long-term memory notes.
//!
//! Notes are small dated facts the engine asks the orchestrator to keep
//! across conversations via the `[[memory]]` directive. The per-user
//! character cap is enforced where notes are accepted (confidant-core);
//! a note that would exceed the cap is dropped, never evicting older
//! notes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single long-term note attached to a user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryNote {
    pub created_on: NaiveDate,
    pub text: String,
}
