//! JSON flat-file implementation of the [`SessionStore`] port.
//!
//! The whole relay document lives in one `data.json`. Reads are served
//! from an in-memory copy; every mutation rewrites the file atomically
//! (serialize to a sibling temp file, then rename over the target). A
//! failed disk write is surfaced to the caller but does not roll back
//! the in-memory update, so the current process keeps a best-effort
//! view of its own state.

use std::path::PathBuf;

use tokio::sync::RwLock;
use uuid::Uuid;

use confidant_core::store::SessionStore;
use confidant_types::error::StoreError;
use confidant_types::schedule::ScheduleEntry;
use confidant_types::session::UserSession;
use confidant_types::store::RelayDocument;

/// Flat-file keyed-document store.
pub struct JsonFileStore {
    path: PathBuf,
    document: RwLock<RelayDocument>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading any existing document.
    ///
    /// A missing file starts a fresh document; an unparseable one is
    /// logged and replaced on the next write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StoreError::Io(err.to_string()))?;
            }
        }

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "relay document unparseable, starting fresh"
                    );
                    RelayDocument::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RelayDocument::default(),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// Replace the file on disk with the given document.
    async fn persist(&self, document: &RelayDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(document)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))
    }
}

impl SessionStore for JsonFileStore {
    async fn load_user(&self, user_id: &str) -> Result<Option<UserSession>, StoreError> {
        Ok(self.document.read().await.users.get(user_id).cloned())
    }

    async fn save_user(&self, user_id: &str, session: &UserSession) -> Result<(), StoreError> {
        let mut document = self.document.write().await;
        document.users.insert(user_id.to_string(), session.clone());
        self.persist(&document).await
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.document.read().await.users.keys().cloned().collect())
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.document.read().await.schedules.clone())
    }

    async fn add_schedules(&self, entries: &[ScheduleEntry]) -> Result<(), StoreError> {
        let mut document = self.document.write().await;
        document.schedules.extend_from_slice(entries);
        self.persist(&document).await
    }

    async fn remove_schedule(&self, id: &Uuid) -> Result<(), StoreError> {
        let mut document = self.document.write().await;
        document.schedules.retain(|entry| entry.id != *id);
        self.persist(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
    use confidant_types::schedule::ScheduleKind;
    use confidant_types::session::Turn;
    use tempfile::TempDir;

    fn session() -> UserSession {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut session = UserSession::new("default", 20, 100, today);
        let at = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .unwrap();
        session.history.push(Turn::user("hello", at));
        session
    }

    fn schedule_entry() -> ScheduleEntry {
        ScheduleEntry {
            id: Uuid::now_v7(),
            kind: ScheduleKind::Clock,
            fire_on: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            fire_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            hint: "morning greeting".to_string(),
            user_id: "u1".to_string(),
            channel_id: "c1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path().join("data.json")).await.unwrap();
        assert!(store.load_user("u1").await.unwrap().is_none());
        assert!(store.list_schedules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saved_session_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.save_user("u1", &session()).await.unwrap();
        drop(store);

        let store = JsonFileStore::open(&path).await.unwrap();
        let loaded = store.load_user("u1").await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history[0].content, "hello");
        assert_eq!(store.list_user_ids().await.unwrap(), vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn test_schedules_add_and_remove() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path().join("data.json")).await.unwrap();

        let entry = schedule_entry();
        let id = entry.id;
        store.add_schedules(&[entry]).await.unwrap();
        assert_eq!(store.list_schedules().await.unwrap().len(), 1);

        store.remove_schedule(&id).await.unwrap();
        assert!(store.list_schedules().await.unwrap().is_empty());

        // Removing an absent entry is not an error.
        store.remove_schedule(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.save_user("u1", &session()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.load_user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("data.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.save_user("u1", &session()).await.unwrap();
        assert!(path.exists());
    }
}
