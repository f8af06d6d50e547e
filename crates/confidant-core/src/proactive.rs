//! Proactive scheduler: the relay's only self-driven process.
//!
//! A single cooperative tick loop. The fine tick (every second)
//! dispatches debounce-due turns and delivers due follow-ups; the
//! coarse scan (every `scan_interval_secs`) fires schedule entries and
//! samples quiet users for inactivity check-ins, keeping store
//! round-trips bounded. A failure while processing one user or one
//! entry is caught and logged; the loop itself never dies. Shutdown is
//! signaled through a `CancellationToken`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, FixedOffset};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use confidant_types::schedule::{ScheduleEntry, ScheduleKind};

use crate::chance::ChanceSource;
use crate::engine::CompletionEngine;
use crate::processor::TurnProcessor;
use crate::store::SessionStore;
use crate::transport::Transport;

/// Drives debounce dispatch, follow-ups, schedule entries, and
/// inactivity check-ins from a shared [`TurnProcessor`].
pub struct ProactiveScheduler<S, E, T> {
    processor: Arc<TurnProcessor<S, E, T>>,
    chance: Arc<dyn ChanceSource>,
}

impl<S, E, T> ProactiveScheduler<S, E, T>
where
    S: SessionStore,
    E: CompletionEngine,
    T: Transport,
{
    pub fn new(processor: Arc<TurnProcessor<S, E, T>>, chance: Arc<dyn ChanceSource>) -> Self {
        Self { processor, chance }
    }

    /// Run the tick loop until the token is canceled.
    pub async fn run(&self, cancel: CancellationToken) {
        let scan_period =
            Duration::seconds(self.processor.config().timing.scan_interval_secs as i64);
        let mut interval = tokio::time::interval(StdDuration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_scan: Option<DateTime<FixedOffset>> = None;

        info!("proactive scheduler started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                    let now = self.processor.clock().now();
                    if last_scan.map_or(true, |t| now - t >= scan_period) {
                        self.scan().await;
                        last_scan = Some(now);
                    }
                }
            }
        }
        info!("proactive scheduler stopped");
    }

    /// Fine tick: dispatch debounce-due users and deliver due
    /// follow-ups.
    pub async fn tick(&self) {
        let now = self.processor.clock().now();
        for user_id in self.processor.buffer().due_users(now) {
            self.processor.dispatch(&user_id).await;
        }
        for (user_id, pending) in self.processor.chases().take_due(now) {
            self.processor.deliver_chase(&user_id, pending).await;
        }
    }

    /// Coarse scan: fire due schedule entries, then sample quiet users.
    pub async fn scan(&self) {
        self.fire_due_schedules().await;
        self.sample_quiet_users().await;
    }

    async fn fire_due_schedules(&self) {
        let now = self.processor.clock().now();
        let today = now.date_naive();
        let offset = *now.offset();

        let entries = match self.processor.store().list_schedules().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "store read failed for schedule scan");
                return;
            }
        };

        for entry in entries {
            if entry.fire_on < today {
                debug!(id = %entry.id, user = %entry.user_id, "schedule entry passed unfired, purging");
                self.remove_entry(&entry).await;
                continue;
            }
            let due = entry
                .fire_moment(offset)
                .is_some_and(|moment| moment <= now);
            if !due {
                continue;
            }
            if entry.kind == ScheduleKind::InactivityDeferred
                && self.recently_active(&entry.user_id, now).await
            {
                // Kept in the store, re-checked on the next scan.
                debug!(id = %entry.id, user = %entry.user_id, "deferred entry suppressed, user recently active");
                continue;
            }

            let prompt = schedule_prompt(&entry);
            match self
                .processor
                .run_synthetic_turn(&entry.user_id, &entry.channel_id, prompt)
                .await
            {
                Ok(sent) => debug!(id = %entry.id, user = %entry.user_id, sent, "schedule entry fired"),
                Err(err) => warn!(id = %entry.id, user = %entry.user_id, error = %err, "scheduled turn failed"),
            }
            // One attempt per entry, delivered or not: proactive sends
            // carry no exactly-once guarantee.
            self.remove_entry(&entry).await;
        }
    }

    async fn remove_entry(&self, entry: &ScheduleEntry) {
        if let Err(err) = self.processor.store().remove_schedule(&entry.id).await {
            warn!(id = %entry.id, error = %err, "store write failed removing schedule entry");
        }
    }

    async fn recently_active(&self, user_id: &str, now: DateTime<FixedOffset>) -> bool {
        let window = Duration::seconds(
            self.processor.config().timing.activity_suppression_secs as i64,
        );
        let session = self
            .processor
            .sessions()
            .get_or_create(user_id, now.date_naive())
            .await;
        session
            .last_activity
            .is_some_and(|last| now - last < window)
    }

    /// Sample every user whose last activity falls in the check-in
    /// window and who has not rolled today. The roll is marked before
    /// its outcome is known: one sample attempt per user per local day,
    /// whichever way the dice land.
    async fn sample_quiet_users(&self) {
        let now = self.processor.clock().now();
        let today = now.date_naive();
        let timing = &self.processor.config().timing;
        let min_idle = Duration::seconds((timing.checkin_min_hours * 3600.0) as i64);
        let max_idle = Duration::seconds((timing.checkin_max_hours * 3600.0) as i64);

        let user_ids = match self.processor.store().list_user_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "store read failed for inactivity scan");
                return;
            }
        };

        for user_id in user_ids {
            let mut session = self.processor.sessions().get_or_create(&user_id, today).await;
            let Some(last_activity) = session.last_activity else {
                continue;
            };
            let Some(channel_id) = session.last_channel.clone() else {
                continue;
            };
            let idle = now - last_activity;
            if idle < min_idle || idle > max_idle {
                continue;
            }
            if session.last_checkin_date == Some(today) {
                continue;
            }

            session.last_checkin_date = Some(today);
            if let Err(err) = self.processor.sessions().save(&user_id, &session).await {
                warn!(user = %user_id, error = %err, "store write failed marking check-in");
            }

            if self.chance.roll() >= timing.checkin_probability {
                debug!(user = %user_id, "inactivity sample rolled no");
                continue;
            }

            let prompt = checkin_prompt(idle);
            match self
                .processor
                .run_synthetic_turn(&user_id, &channel_id, prompt)
                .await
            {
                Ok(sent) => debug!(user = %user_id, sent, "inactivity check-in"),
                Err(err) => warn!(user = %user_id, error = %err, "inactivity check-in failed"),
            }
        }
    }
}

/// Synthetic system-authored prompt for a fired schedule entry.
fn schedule_prompt(entry: &ScheduleEntry) -> String {
    match entry.kind {
        ScheduleKind::Clock => format!(
            "(A reminder you scheduled earlier is due now: \"{}\". Bring it \
             up with the user in your own words. If messaging them about it \
             no longer makes sense, reply with [[do-not-send]].)",
            entry.hint
        ),
        ScheduleKind::InactivityDeferred => format!(
            "(The user has been away for a while and you planned to reach \
             out about: \"{}\". Send them a message about it now. If it is \
             better to stay silent, reply with [[do-not-send]].)",
            entry.hint
        ),
    }
}

/// Synthetic system-authored prompt for an inactivity check-in.
fn checkin_prompt(idle: Duration) -> String {
    format!(
        "(The user has been quiet for about {} hours. Check in casually if \
         it feels natural. If reaching out now would be unwelcome, reply \
         with [[do-not-send]].)",
        idle.num_hours().max(1)
    )
}
