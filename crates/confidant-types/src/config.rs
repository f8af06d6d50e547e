//! Relay configuration.
//!
//! Deserialized from `config.toml` by the infra loader. Every field has
//! a default so a missing or partial file still yields a runnable relay;
//! the model catalog always contains at least the default model.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry in the model catalog, keyed by a short user-facing name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model string sent to the completion engine.
    pub upstream: String,
    /// Premium credits debited per turn.
    #[serde(default)]
    pub cost: u32,
    /// Hidden from (and silently downgraded for) non-administrators.
    #[serde(default)]
    pub admin_only: bool,
    /// Default context-window ceiling in estimated tokens.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,
}

fn default_max_context_tokens() -> u32 {
    110_000
}

/// Daily usage allowances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaPolicy {
    #[serde(default = "default_daily_credits")]
    pub daily_credits: u32,
    #[serde(default = "default_daily_fallback_uses")]
    pub daily_fallback_uses: u32,
}

fn default_daily_credits() -> u32 {
    20
}

fn default_daily_fallback_uses() -> u32 {
    100
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            daily_credits: default_daily_credits(),
            daily_fallback_uses: default_daily_fallback_uses(),
        }
    }
}

/// Timing knobs for debouncing, proactive scans, and sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Debounce wait after a fragment that reads finished.
    #[serde(default = "default_debounce_short_secs")]
    pub debounce_short_secs: u64,
    /// Debounce wait after a fragment that reads unfinished (judge only).
    #[serde(default = "default_debounce_long_secs")]
    pub debounce_long_secs: u64,
    /// Coarse scan period for schedules and inactivity sampling.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Pause between fragments of a multi-part reply.
    #[serde(default = "default_fragment_pause_ms")]
    pub fragment_pause_ms: u64,
    /// Lower bound of the inactivity sampling window, in hours.
    #[serde(default = "default_checkin_min_hours")]
    pub checkin_min_hours: f64,
    /// Upper bound of the inactivity sampling window, in hours.
    #[serde(default = "default_checkin_max_hours")]
    pub checkin_max_hours: f64,
    /// Probability of a check-in once the window is observed.
    #[serde(default = "default_checkin_probability")]
    pub checkin_probability: f64,
    /// How recently a user must have been active for an
    /// inactivity-deferred entry to be suppressed.
    #[serde(default = "default_activity_suppression_secs")]
    pub activity_suppression_secs: u64,
}

fn default_debounce_short_secs() -> u64 {
    5
}

fn default_debounce_long_secs() -> u64 {
    30
}

fn default_scan_interval_secs() -> u64 {
    30
}

fn default_fragment_pause_ms() -> u64 {
    500
}

fn default_checkin_min_hours() -> f64 {
    4.0
}

fn default_checkin_max_hours() -> f64 {
    6.0
}

fn default_checkin_probability() -> f64 {
    0.7
}

fn default_activity_suppression_secs() -> u64 {
    300
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_short_secs: default_debounce_short_secs(),
            debounce_long_secs: default_debounce_long_secs(),
            scan_interval_secs: default_scan_interval_secs(),
            fragment_pause_ms: default_fragment_pause_ms(),
            checkin_min_hours: default_checkin_min_hours(),
            checkin_max_hours: default_checkin_max_hours(),
            checkin_probability: default_checkin_probability(),
            activity_suppression_secs: default_activity_suppression_secs(),
        }
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Persona text placed at the top of every system prompt.
    #[serde(default = "default_persona")]
    pub persona: String,
    /// Distinguished user identifier that bypasses quota and
    /// model-visibility restrictions.
    #[serde(default)]
    pub admin_user: Option<String>,
    /// Catalog key of the default (fallback) model.
    #[serde(default = "default_model_key")]
    pub default_model: String,
    /// Model catalog, keyed by short name.
    #[serde(default)]
    pub models: HashMap<String, ModelSpec>,
    /// Catalog key of the optional turn-completion judge model.
    #[serde(default)]
    pub judge_model: Option<String>,
    #[serde(default)]
    pub quota: QuotaPolicy,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Per-user cap on the summed length of memory notes, in characters.
    #[serde(default = "default_memory_cap_chars")]
    pub memory_cap_chars: usize,
    /// The relay's local time, as minutes east of UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_persona() -> String {
    "You are a warm, concise conversational companion.".to_string()
}

fn default_model_key() -> String {
    "default".to_string()
}

fn default_memory_cap_chars() -> usize {
    2000
}

fn default_utc_offset_minutes() -> i32 {
    480
}

impl Default for RelayConfig {
    fn default() -> Self {
        let mut config = Self {
            persona: default_persona(),
            admin_user: None,
            default_model: default_model_key(),
            models: HashMap::new(),
            judge_model: None,
            quota: QuotaPolicy::default(),
            timing: TimingConfig::default(),
            memory_cap_chars: default_memory_cap_chars(),
            utc_offset_minutes: default_utc_offset_minutes(),
        };
        config.ensure_default_model();
        config
    }
}

impl RelayConfig {
    /// Guarantee the catalog contains the default model key.
    ///
    /// Called by the loader after deserialization so `resolve` can always
    /// fall back to a real entry.
    pub fn ensure_default_model(&mut self) {
        self.models
            .entry(self.default_model.clone())
            .or_insert_with(|| ModelSpec {
                upstream: "claude-sonnet-4-5".to_string(),
                cost: 1,
                admin_only: false,
                max_context_tokens: default_max_context_tokens(),
            });
    }

    /// Look up a catalog entry, falling back to the default model when
    /// the key is unknown.
    ///
    /// Returns the effective key together with its spec.
    pub fn resolve<'a>(&'a self, key: &'a str) -> (&'a str, &'a ModelSpec) {
        match self.models.get(key) {
            Some(spec) => (key, spec),
            None => {
                let spec = self
                    .models
                    .get(&self.default_model)
                    .expect("catalog always contains the default model");
                (self.default_model.as_str(), spec)
            }
        }
    }

    /// Whether the given user identifier is the administrator.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user.as_deref() == Some(user_id)
    }

    /// The relay's local UTC offset.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }
}
