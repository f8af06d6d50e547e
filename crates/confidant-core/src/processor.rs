//! Turn processor: one completed turn, end to end.
//!
//! Per-user state machine: Idle -> Buffering (first fragment) ->
//! Debounced (deadline elapsed) -> Dispatched (engine call in flight)
//! -> Idle. Dispatched is entered at most once per drained buffer; the
//! in-flight guard makes the per-user single-writer discipline explicit
//! when dispatch fans out across users. A failed engine call discards
//! the drained fragments and returns to Idle; the user sees an error
//! message instead of a reply.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset};
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use confidant_types::config::RelayConfig;
use confidant_types::engine::CompletionRequest;
use confidant_types::memory::MemoryNote;
use confidant_types::schedule::{PendingFollowUp, ScheduleEntry};
use confidant_types::session::{AttachmentRef, Turn, UserSession};

use crate::chase::ChaseTable;
use crate::clock::Clock;
use crate::context::build_context;
use crate::debounce::{DebounceBuffer, Fragment};
use crate::directive::{self, ParsedReply};
use crate::engine::CompletionEngine;
use crate::judge::{CompletionJudge, JudgeVerdict};
use crate::prompt::compose_system_prompt;
use crate::quota::{self, QuotaNotice, QuotaVerdict};
use crate::session::SessionService;
use crate::store::SessionStore;
use crate::transport::Transport;

/// Visible text sent when the engine call fails.
pub const ENGINE_FAILURE_TEXT: &str =
    "Something went wrong while reaching the model. Please try again in a moment.";

/// Visible text sent when every allowance is exhausted.
pub const QUOTA_EXHAUSTED_TEXT: &str =
    "You've run out of credits for today. Balances reset at midnight.";

fn fallback_notice_text(remaining: u32) -> String {
    format!(
        "You've run out of premium credits, so I switched to the default model \
         ({remaining} uses left today)."
    )
}

/// Orchestrates one completed turn end to end.
pub struct TurnProcessor<S, E, T> {
    config: Arc<RelayConfig>,
    clock: Arc<dyn Clock>,
    sessions: SessionService<S>,
    store: Arc<S>,
    engine: Arc<E>,
    transport: Arc<T>,
    buffer: DebounceBuffer,
    chases: ChaseTable,
    judge: Option<CompletionJudge<E>>,
    in_flight: DashMap<String, ()>,
}

impl<S, E, T> TurnProcessor<S, E, T>
where
    S: SessionStore,
    E: CompletionEngine,
    T: Transport,
{
    pub fn new(
        config: Arc<RelayConfig>,
        clock: Arc<dyn Clock>,
        store: Arc<S>,
        engine: Arc<E>,
        transport: Arc<T>,
    ) -> Self {
        let judge = config
            .judge_model
            .as_ref()
            .map(|key| {
                let (_, spec) = config.resolve(key);
                CompletionJudge::new(Arc::clone(&engine), spec.upstream.clone())
            });

        Self {
            sessions: SessionService::new(Arc::clone(&store), Arc::clone(&config)),
            config,
            clock,
            store,
            engine,
            transport,
            buffer: DebounceBuffer::new(),
            chases: ChaseTable::new(),
            judge,
            in_flight: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn sessions(&self) -> &SessionService<S> {
        &self.sessions
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn buffer(&self) -> &DebounceBuffer {
        &self.buffer
    }

    pub fn chases(&self) -> &ChaseTable {
        &self.chases
    }

    /// Accept one inbound fragment: cancel any armed follow-up (the
    /// user's return preempts the nudge), then buffer the fragment and
    /// reset the debounce deadline.
    pub async fn handle_fragment(
        &self,
        user_id: &str,
        channel_id: &str,
        text: String,
        attachments: Vec<AttachmentRef>,
    ) {
        let now = self.clock.now();

        if self.chases.cancel(user_id).is_some() {
            debug!(user = user_id, "pending follow-up canceled by new message");
        }

        let fragment = Fragment {
            text,
            attachments,
            at: now,
        };
        let short = Duration::seconds(self.config.timing.debounce_short_secs as i64);
        self.buffer.append(user_id, channel_id, fragment, now, short);

        // The judge may take a moment; the burst keeps buffering
        // meanwhile, and an Incomplete verdict just pushes the deadline.
        if let Some(judge) = &self.judge {
            let pending = self.buffer.fragments_snapshot(user_id);
            if judge.assess(&pending).await == JudgeVerdict::Incomplete {
                let long = Duration::seconds(self.config.timing.debounce_long_secs as i64);
                self.buffer.postpone(user_id, self.clock.now(), long);
            }
        }
    }

    /// Dispatch the user's debounced buffer as one turn.
    ///
    /// No-op when another dispatch for the same user is in flight (the
    /// fresh buffer stays queued for a later tick) or when the buffer
    /// is empty.
    pub async fn dispatch(&self, user_id: &str) {
        if self.in_flight.insert(user_id.to_string(), ()).is_some() {
            debug!(user = user_id, "dispatch deferred, turn already in flight");
            return;
        }
        let result = self.dispatch_inner(user_id).await;
        self.in_flight.remove(user_id);
        if let Err(err) = result {
            warn!(user = user_id, error = %err, "turn dispatch failed");
        }
    }

    async fn dispatch_inner(&self, user_id: &str) -> anyhow::Result<()> {
        let Some((channel_id, fragments)) = self.buffer.drain(user_id) else {
            return Ok(());
        };

        let now = self.clock.now();
        let mut session = self.sessions.get_or_create(user_id, now.date_naive()).await;
        let is_admin = self.config.is_admin(user_id);

        let model_key = match quota::authorize(&mut session, &self.config, is_admin) {
            QuotaVerdict::Denied => {
                if let Err(err) = self.sessions.save(user_id, &session).await {
                    warn!(user = user_id, error = %err, "store write failed");
                }
                self.send_one(&channel_id, QUOTA_EXHAUSTED_TEXT).await;
                return Ok(());
            }
            QuotaVerdict::Allowed { model_key, notice } => {
                if let Some(QuotaNotice::SwitchedToFallback { remaining }) = notice {
                    self.send_one(&channel_id, &fallback_notice_text(remaining)).await;
                }
                model_key
            }
        };

        let merged: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        let attachments: Vec<AttachmentRef> = fragments
            .iter()
            .flat_map(|f| f.attachments.iter().cloned())
            .collect();
        let turn_at = fragments.last().map_or(now, |f| f.at);
        let mut user_turn = Turn::user(merged.join("\n"), turn_at);
        user_turn.attachments = attachments;

        let (_, spec) = self.config.resolve(&model_key);
        let messages = build_context(&session, spec, std::slice::from_ref(&user_turn));
        let request = CompletionRequest {
            model: spec.upstream.clone(),
            system: Some(compose_system_prompt(
                &self.config.persona,
                &session.notes,
                now,
            )),
            messages,
        };

        let raw = match self.engine.complete(&request).await {
            Ok(raw) => raw,
            Err(err) => {
                // Accepted data loss: the drained fragments are not
                // requeued. The debited allowance is persisted.
                warn!(user = user_id, error = %err, "engine call failed, turn discarded");
                if let Err(save_err) = self.sessions.save(user_id, &session).await {
                    warn!(user = user_id, error = %save_err, "store write failed");
                }
                self.send_one(&channel_id, ENGINE_FAILURE_TEXT).await;
                return Ok(());
            }
        };
        debug!(user = user_id, reply = %raw, "engine reply received");

        let parsed = directive::parse(&raw, now);
        self.apply_reply(user_id, &channel_id, &mut session, Some(user_turn), &parsed, &model_key, now)
            .await;
        Ok(())
    }

    /// Run a synthetic system-authored prompt through the same engine
    /// and parser path as a user turn. The prompt itself is never
    /// persisted. Returns whether anything was sent.
    pub async fn run_synthetic_turn(
        &self,
        user_id: &str,
        channel_id: &str,
        prompt: String,
    ) -> anyhow::Result<bool> {
        let now = self.clock.now();
        let mut session = self.sessions.get_or_create(user_id, now.date_naive()).await;
        let (model_key, spec) = self.config.resolve(&session.model);
        let model_key = model_key.to_string();

        let synthetic = Turn::user(prompt, now);
        let messages = build_context(&session, spec, std::slice::from_ref(&synthetic));
        let request = CompletionRequest {
            model: spec.upstream.clone(),
            system: Some(compose_system_prompt(
                &self.config.persona,
                &session.notes,
                now,
            )),
            messages,
        };

        let raw = self.engine.complete(&request).await?;
        let parsed = directive::parse(&raw, now);
        if parsed.suppressed {
            debug!(user = user_id, "synthetic turn suppressed by engine");
            return Ok(false);
        }

        self.apply_reply(user_id, channel_id, &mut session, None, &parsed, &model_key, now)
            .await;
        Ok(true)
    }

    /// Deliver an armed follow-up directly (no engine call) and record
    /// it as an assistant turn.
    pub async fn deliver_chase(&self, user_id: &str, pending: PendingFollowUp) {
        let now = self.clock.now();
        if let Err(err) = self
            .transport
            .send_text(&pending.channel_id, &pending.text)
            .await
        {
            warn!(user = user_id, error = %err, "follow-up send failed");
            return;
        }

        let mut session = self.sessions.get_or_create(user_id, now.date_naive()).await;
        session.history.push(Turn::assistant(pending.text, now, None));
        if let Err(err) = self.sessions.save(user_id, &session).await {
            warn!(user = user_id, error = %err, "store write failed after follow-up");
        }
    }

    /// Persist a parsed reply's effects, then send the visible
    /// fragments in order.
    ///
    /// `user_turn` is present for real turns and absent for synthetic
    /// ones; activity tracking only moves for real turns. History
    /// append order within a turn is user turn first, assistant turn
    /// second, and is never reordered afterwards.
    #[allow(clippy::too_many_arguments)]
    async fn apply_reply(
        &self,
        user_id: &str,
        channel_id: &str,
        session: &mut UserSession,
        user_turn: Option<Turn>,
        parsed: &ParsedReply,
        model_key: &str,
        now: DateTime<FixedOffset>,
    ) {
        if parsed.suppressed {
            if let Some(turn) = user_turn {
                session.history.push(turn);
                if let Err(err) = self.sessions.save(user_id, session).await {
                    warn!(user = user_id, error = %err, "store write failed");
                }
            }
            return;
        }

        let is_user_turn = user_turn.is_some();
        if let Some(turn) = user_turn {
            session.history.push(turn);
        }
        session
            .history
            .push(Turn::assistant(parsed.visible.clone(), now, Some(model_key.to_string())));
        if is_user_turn {
            session.last_activity = Some(now);
            session.last_channel = Some(channel_id.to_string());
        }

        let today = now.date_naive();
        for note in &parsed.notes {
            if session.notes_len() + note.chars().count() <= self.config.memory_cap_chars {
                session.notes.push(MemoryNote {
                    created_on: today,
                    text: note.clone(),
                });
            } else {
                debug!(user = user_id, "memory note dropped, character cap reached");
            }
        }

        if !parsed.schedules.is_empty() {
            let entries: Vec<ScheduleEntry> = parsed
                .schedules
                .iter()
                .map(|d| ScheduleEntry {
                    id: Uuid::now_v7(),
                    kind: d.kind,
                    fire_on: d.fire_on,
                    fire_at: d.fire_at,
                    hint: d.hint.clone(),
                    user_id: user_id.to_string(),
                    channel_id: channel_id.to_string(),
                })
                .collect();
            if let Err(err) = self.store.add_schedules(&entries).await {
                warn!(user = user_id, error = %err, "store write failed for schedules");
            }
        }

        if let Some(follow_up) = &parsed.follow_up {
            self.chases.arm(
                user_id,
                PendingFollowUp {
                    text: follow_up.text.clone(),
                    due_at: now + Duration::minutes(follow_up.delay_minutes),
                    channel_id: channel_id.to_string(),
                },
            );
        }

        if let Err(err) = self.sessions.save(user_id, session).await {
            warn!(user = user_id, error = %err, "store write failed");
        }

        let fragments = parsed.fragments();
        for (i, fragment) in fragments.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(StdDuration::from_millis(self.config.timing.fragment_pause_ms))
                    .await;
            }
            self.send_one(channel_id, fragment).await;
        }
    }

    async fn send_one(&self, channel_id: &str, text: &str) {
        if let Err(err) = self.transport.send_text(channel_id, text).await {
            warn!(channel = channel_id, error = %err, "transport send failed");
        }
    }
}
