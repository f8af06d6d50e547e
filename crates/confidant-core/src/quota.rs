//! Quota gate.
//!
//! Decides whether a turn may be dispatched and debits the user's daily
//! allowance. Pure over the session record: the caller persists the
//! mutated session afterwards.
//!
//! Policy, in order: the administrator bypasses all checks; admin-only
//! models are silently downgraded to the default model for everyone
//! else before cost is evaluated; premium credits cover the model's
//! cost; otherwise the daily fallback allowance covers one use of the
//! default model, force-switching the selection if needed; otherwise
//! the turn is denied.

use confidant_types::config::RelayConfig;
use confidant_types::session::UserSession;

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaVerdict {
    /// Dispatch with this catalog key (possibly downgraded/switched).
    Allowed {
        model_key: String,
        notice: Option<QuotaNotice>,
    },
    /// All allowances exhausted; the turn must not run.
    Denied,
}

/// One-time user-facing notice attached to an allowance decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaNotice {
    /// Premium credits ran out; the selection was switched to the
    /// default model.
    SwitchedToFallback { remaining: u32 },
}

/// Check and debit the user's allowance for one turn.
pub fn authorize(session: &mut UserSession, config: &RelayConfig, is_admin: bool) -> QuotaVerdict {
    let (resolved_key, spec) = config.resolve(&session.model);
    let mut model_key = resolved_key.to_string();

    if is_admin {
        return QuotaVerdict::Allowed {
            model_key,
            notice: None,
        };
    }

    if spec.admin_only {
        model_key = config.default_model.clone();
        session.model = model_key.clone();
    }
    let (_, spec) = config.resolve(&model_key);
    let cost = spec.cost;

    if session.premium_credits >= cost {
        session.premium_credits -= cost;
        return QuotaVerdict::Allowed {
            model_key,
            notice: None,
        };
    }

    if model_key == config.default_model && session.fallback_uses > 0 {
        session.fallback_uses -= 1;
        return QuotaVerdict::Allowed {
            model_key,
            notice: None,
        };
    }

    if model_key != config.default_model && session.fallback_uses > 0 {
        session.model = config.default_model.clone();
        session.fallback_uses -= 1;
        return QuotaVerdict::Allowed {
            model_key: config.default_model.clone(),
            notice: Some(QuotaNotice::SwitchedToFallback {
                remaining: session.fallback_uses,
            }),
        };
    }

    QuotaVerdict::Denied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{at, test_config};

    fn session(model: &str, credits: u32, fallback: u32) -> UserSession {
        let today = at(2026, 3, 1, 12, 0, 0).date_naive();
        let mut session = UserSession::new(model, credits, fallback, today);
        session.model = model.to_string();
        session
    }

    #[test]
    fn test_premium_credits_cover_cost() {
        let config = test_config();
        let mut session = session("premium", 5, 100);
        let verdict = authorize(&mut session, &config, false);
        assert_eq!(
            verdict,
            QuotaVerdict::Allowed {
                model_key: "premium".to_string(),
                notice: None
            }
        );
        assert_eq!(session.premium_credits, 3);
        assert_eq!(session.fallback_uses, 100);
    }

    #[test]
    fn test_default_model_falls_back_to_uses() {
        let config = test_config();
        let mut session = session("default", 0, 10);
        let verdict = authorize(&mut session, &config, false);
        assert!(matches!(verdict, QuotaVerdict::Allowed { ref model_key, notice: None } if model_key == "default"));
        assert_eq!(session.fallback_uses, 9);
    }

    #[test]
    fn test_force_switch_scenario() {
        // 0 premium credits, 3 fallback uses, non-default model costing 2:
        // the gate force-switches to the default model and debits one use.
        let config = test_config();
        let mut session = session("premium", 0, 3);
        let verdict = authorize(&mut session, &config, false);
        match verdict {
            QuotaVerdict::Allowed { model_key, notice } => {
                assert_eq!(model_key, "default");
                assert_eq!(
                    notice,
                    Some(QuotaNotice::SwitchedToFallback { remaining: 2 })
                );
            }
            QuotaVerdict::Denied => panic!("expected force-switch, got denial"),
        }
        assert_eq!(session.model, "default");
        assert_eq!(session.fallback_uses, 2);
        assert_eq!(session.premium_credits, 0);
    }

    #[test]
    fn test_everything_exhausted_is_denied() {
        let config = test_config();
        let mut session_default = session("default", 0, 0);
        assert_eq!(authorize(&mut session_default, &config, false), QuotaVerdict::Denied);
        let mut session_premium = session("premium", 1, 0);
        assert_eq!(authorize(&mut session_premium, &config, false), QuotaVerdict::Denied);
    }

    #[test]
    fn test_admin_bypasses_all_checks() {
        let config = test_config();
        let mut session = session("secret", 0, 0);
        let verdict = authorize(&mut session, &config, true);
        assert!(matches!(verdict, QuotaVerdict::Allowed { ref model_key, .. } if model_key == "secret"));
        assert_eq!(session.premium_credits, 0);
        assert_eq!(session.fallback_uses, 0);
    }

    #[test]
    fn test_admin_only_model_downgraded_for_regular_user() {
        let config = test_config();
        let mut session = session("secret", 20, 100);
        let verdict = authorize(&mut session, &config, false);
        assert!(matches!(verdict, QuotaVerdict::Allowed { ref model_key, notice: None } if model_key == "default"));
        assert_eq!(session.model, "default");
        // Cost evaluated on the downgraded model.
        assert_eq!(session.premium_credits, 19);
    }

    #[test]
    fn test_unknown_model_resolves_to_default() {
        let config = test_config();
        let mut session = session("discontinued", 20, 100);
        let verdict = authorize(&mut session, &config, false);
        assert!(matches!(verdict, QuotaVerdict::Allowed { ref model_key, .. } if model_key == "default"));
    }
}
