//! Shared test fixtures: a manually advanced clock, a scripted engine,
//! a recording transport, and an in-memory store.
//!
//! Everything here is deterministic; no test in this crate touches the
//! wall clock, the network, or the filesystem.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use uuid::Uuid;

use confidant_types::config::{ModelSpec, RelayConfig};
use confidant_types::engine::{CompletionRequest, EngineError};
use confidant_types::error::{StoreError, TransportError};
use confidant_types::schedule::ScheduleEntry;
use confidant_types::session::UserSession;

use crate::chance::ChanceSource;
use crate::clock::Clock;
use crate::engine::CompletionEngine;
use crate::processor::TurnProcessor;
use crate::store::SessionStore;
use crate::transport::Transport;

/// A local timestamp in the test offset (+08:00).
pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(year, month, day, hour, min, sec)
        .unwrap()
}

/// Catalog with a cheap default, a costlier premium model, and an
/// admin-only model.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.models.insert(
        "premium".to_string(),
        ModelSpec {
            upstream: "claude-opus-4-1".to_string(),
            cost: 2,
            admin_only: false,
            max_context_tokens: 180_000,
        },
    );
    config.models.insert(
        "secret".to_string(),
        ModelSpec {
            upstream: "claude-opus-4-1".to_string(),
            cost: 3,
            admin_only: true,
            max_context_tokens: 180_000,
        },
    );
    config
}

/// Clock that only moves when a test advances it.
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap()
    }
}

/// Chance source that always rolls the same value.
pub struct FixedChance(pub f64);

impl ChanceSource for FixedChance {
    fn roll(&self) -> f64 {
        self.0
    }
}

/// Engine that replays scripted replies in order and records every
/// request it receives. With no scripted reply left it fails, which is
/// how tests exercise the engine-failure path.
#[derive(Default)]
pub struct MockEngine {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionEngine for MockEngine {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError::Http("no scripted reply".to_string()))
    }
}

/// Transport that records every `(channel, text)` pair it is handed.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// In-memory [`SessionStore`] with the same whole-document semantics as
/// the flat-file store.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserSession>>,
    schedules: Mutex<Vec<ScheduleEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    async fn load_user(&self, user_id: &str) -> Result<Option<UserSession>, StoreError> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn save_user(&self, user_id: &str, session: &UserSession) -> Result<(), StoreError> {
        self.users
            .lock()
            .unwrap()
            .insert(user_id.to_string(), session.clone());
        Ok(())
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.users.lock().unwrap().keys().cloned().collect())
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self.schedules.lock().unwrap().clone())
    }

    async fn add_schedules(&self, entries: &[ScheduleEntry]) -> Result<(), StoreError> {
        self.schedules.lock().unwrap().extend_from_slice(entries);
        Ok(())
    }

    async fn remove_schedule(&self, id: &Uuid) -> Result<(), StoreError> {
        self.schedules.lock().unwrap().retain(|entry| entry.id != *id);
        Ok(())
    }
}

/// A fully wired [`TurnProcessor`] over the mocks above.
pub struct ProcessorFixture {
    pub config: Arc<RelayConfig>,
    pub store: Arc<MemoryStore>,
    pub engine: Arc<MockEngine>,
    pub transport: Arc<MockTransport>,
    pub processor: Arc<TurnProcessor<MemoryStore, MockEngine, MockTransport>>,
}

pub fn processor_fixture(clock: Arc<ManualClock>) -> ProcessorFixture {
    let config = Arc::new(test_config());
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(MockEngine::new());
    let transport = Arc::new(MockTransport::new());
    let processor = Arc::new(TurnProcessor::new(
        Arc::clone(&config),
        clock,
        Arc::clone(&store),
        Arc::clone(&engine),
        Arc::clone(&transport),
    ));
    ProcessorFixture {
        config,
        store,
        engine,
        transport,
        processor,
    }
}

impl ProcessorFixture {
    /// Swap in a different config, keeping the store, engine, and
    /// transport (and everything they have recorded).
    pub fn rebuild_with_config(&mut self, config: RelayConfig, clock: Arc<ManualClock>) {
        self.config = Arc::new(config);
        self.processor = Arc::new(TurnProcessor::new(
            Arc::clone(&self.config),
            clock,
            Arc::clone(&self.store),
            Arc::clone(&self.engine),
            Arc::clone(&self.transport),
        ));
    }
}
