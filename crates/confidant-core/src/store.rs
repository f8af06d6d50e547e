//! SessionStore trait definition.
//!
//! The durable store is an abstract keyed-document store with
//! whole-document read/replace semantics: user sessions are read and
//! replaced as whole records, schedule entries as a flat collection.
//! Implementations live in confidant-infra (e.g., `JsonFileStore`).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use confidant_types::error::StoreError;
use confidant_types::schedule::ScheduleEntry;
use confidant_types::session::UserSession;
use uuid::Uuid;

/// Port for durable session and schedule persistence.
pub trait SessionStore: Send + Sync {
    /// Read one user's session record, if present.
    fn load_user(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserSession>, StoreError>> + Send;

    /// Replace one user's session record.
    fn save_user(
        &self,
        user_id: &str,
        session: &UserSession,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// List every known user identifier (for the inactivity scan).
    fn list_user_ids(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Read all pending schedule entries.
    fn list_schedules(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ScheduleEntry>, StoreError>> + Send;

    /// Append new schedule entries.
    fn add_schedules(
        &self,
        entries: &[ScheduleEntry],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a schedule entry by id. Deleting an absent entry is not an
    /// error (fire and purge paths may race).
    fn remove_schedule(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
