//! Session service: daily reset, overrides, model selection, export.
//!
//! Sits on top of the abstract [`SessionStore`] and owns the invariant
//! that daily allowances reset exactly once per local calendar day, on
//! first access after the date rolls over. Store failures are logged
//! and degrade to best-effort in-memory state; they never break a turn.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use confidant_types::config::RelayConfig;
use confidant_types::error::{SessionError, StoreError};
use confidant_types::session::{MessageRole, UserSession};

use crate::store::SessionStore;

/// Session lifecycle and settings operations over a [`SessionStore`].
pub struct SessionService<S> {
    store: Arc<S>,
    config: Arc<RelayConfig>,
}

impl<S: SessionStore> SessionService<S> {
    pub fn new(store: Arc<S>, config: Arc<RelayConfig>) -> Self {
        Self { store, config }
    }

    /// Load the user's session, creating it on first contact and
    /// applying the once-per-day quota reset.
    ///
    /// A store read failure degrades to a fresh in-memory session for
    /// this tick rather than failing the turn.
    pub async fn get_or_create(&self, user_id: &str, today: NaiveDate) -> UserSession {
        let loaded = match self.store.load_user(user_id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(user = user_id, error = %err, "store read failed, using fresh session state");
                None
            }
        };

        match loaded {
            Some(mut session) => {
                if session.last_reset != today {
                    session.premium_credits = self.config.quota.daily_credits;
                    session.fallback_uses = self.config.quota.daily_fallback_uses;
                    session.last_reset = today;
                    debug!(user = user_id, %today, "daily quota reset");
                    if let Err(err) = self.store.save_user(user_id, &session).await {
                        warn!(user = user_id, error = %err, "store write failed after daily reset");
                    }
                }
                session
            }
            None => {
                let session = UserSession::new(
                    self.config.default_model.clone(),
                    self.config.quota.daily_credits,
                    self.config.quota.daily_fallback_uses,
                    today,
                );
                if let Err(err) = self.store.save_user(user_id, &session).await {
                    warn!(user = user_id, error = %err, "store write failed for new session");
                }
                session
            }
        }
    }

    /// Persist a mutated session record.
    pub async fn save(&self, user_id: &str, session: &UserSession) -> Result<(), StoreError> {
        self.store.save_user(user_id, session).await
    }

    /// Drop the user's turn history, keeping notes and balances.
    pub async fn clear_history(&self, user_id: &str, today: NaiveDate) -> Result<(), StoreError> {
        let mut session = self.get_or_create(user_id, today).await;
        session.history.clear();
        self.save(user_id, &session).await
    }

    /// Set or clear the per-user context token budget override.
    pub async fn set_token_override(
        &self,
        user_id: &str,
        value: Option<u32>,
        today: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut session = self.get_or_create(user_id, today).await;
        session.token_budget_override = value;
        self.save(user_id, &session).await
    }

    /// Set or clear the per-user round-count override.
    pub async fn set_round_override(
        &self,
        user_id: &str,
        value: Option<u32>,
        today: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut session = self.get_or_create(user_id, today).await;
        session.round_limit_override = value;
        self.save(user_id, &session).await
    }

    /// Select a model from the catalog. Admin-only models are rejected
    /// for everyone but the administrator.
    pub async fn select_model(
        &self,
        user_id: &str,
        model_key: &str,
        is_admin: bool,
        today: NaiveDate,
    ) -> Result<(), SessionError> {
        let spec = self
            .config
            .models
            .get(model_key)
            .ok_or_else(|| SessionError::UnknownModel(model_key.to_string()))?;
        if spec.admin_only && !is_admin {
            return Err(SessionError::AdminOnly(model_key.to_string()));
        }

        let mut session = self.get_or_create(user_id, today).await;
        session.model = model_key.to_string();
        self.save(user_id, &session).await?;
        Ok(())
    }

    /// Render the user's history as a plain-text transcript.
    pub async fn export_history(&self, user_id: &str, today: NaiveDate) -> String {
        let session = self.get_or_create(user_id, today).await;
        let mut out = String::from("=== Chat History ===\n\n");
        for turn in &session.history {
            let who = match turn.role {
                MessageRole::Assistant => "AI",
                _ => "You",
            };
            out.push_str(&format!(
                "[{}] {}: {}\n\n",
                turn.at.format("%Y-%m-%d %H:%M"),
                who,
                turn.content
            ));
        }
        out
    }
}
