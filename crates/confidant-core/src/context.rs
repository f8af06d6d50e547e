//! Context window builder.
//!
//! Assembles the token- and round-bounded slice of a user's history sent
//! to the completion engine for one turn. The returned sequence is
//! always a contiguous chronological suffix of history, never an
//! arbitrary subset, and its estimated token cost never exceeds the
//! active budget.

use confidant_types::config::ModelSpec;
use confidant_types::engine::EngineMessage;
use confidant_types::session::{Turn, UserSession};

/// How many of the most recent turns get a timestamp label. Older turns
/// are left unlabeled to save budget.
pub const RECENT_LABELED_TURNS: usize = 20;

/// Timestamp label rendered in front of recent turns.
pub const TIMESTAMP_LABEL_FORMAT: &str = "%m-%d %H:%M";

/// Estimated token cost of a piece of text.
///
/// Deliberately crude: two tokens per character overshoots for ASCII and
/// roughly matches CJK, which keeps the window safely under real limits.
pub fn estimate_tokens(text: &str) -> u32 {
    text.chars().count() as u32 * 2
}

/// The token budget in force for this user and model.
pub fn active_budget(session: &UserSession, spec: &ModelSpec) -> u32 {
    session
        .token_budget_override
        .unwrap_or(spec.max_context_tokens)
}

/// Build the engine-facing message sequence for one turn.
///
/// `extra` holds turns not yet persisted (the merged user turn, or a
/// synthetic prompt); they are treated as the newest history entries.
pub fn build_context(session: &UserSession, spec: &ModelSpec, extra: &[Turn]) -> Vec<EngineMessage> {
    let mut history: Vec<&Turn> = session.history.iter().chain(extra.iter()).collect();

    // Round limit first: one round is one user turn plus one assistant turn.
    if let Some(rounds) = session.round_limit_override {
        let keep = (rounds as usize).saturating_mul(2);
        if history.len() > keep {
            history.drain(..history.len() - keep);
        }
    }

    // Walk newest to oldest, accumulating cost until the budget is hit.
    // The walk stops at the first turn that would overflow, which keeps
    // the kept set a contiguous suffix.
    let budget = active_budget(session, spec);
    let mut total = 0u32;
    let mut kept = 0usize;
    for turn in history.iter().rev() {
        let cost = estimate_tokens(&turn.content);
        if total + cost > budget {
            break;
        }
        total += cost;
        kept += 1;
    }
    let kept_turns = &history[history.len() - kept..];

    // Rendering pass: label the most recent turns with a compact local
    // timestamp; everything older goes through unlabeled.
    let first_labeled = kept_turns.len().saturating_sub(RECENT_LABELED_TURNS);
    kept_turns
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            let content = if i >= first_labeled {
                format!("[{}] {}", turn.at.format(TIMESTAMP_LABEL_FORMAT), turn.content)
            } else {
                turn.content.clone()
            };
            EngineMessage {
                role: turn.role,
                content,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{at, test_config};
    use chrono::Duration;
    use confidant_types::session::MessageRole;

    fn session_with_history(len: usize) -> UserSession {
        let t0 = at(2026, 3, 1, 12, 0, 0);
        let mut session = UserSession::new("default", 20, 100, t0.date_naive());
        for i in 0..len {
            let turn_at = t0 + Duration::minutes(i as i64);
            if i % 2 == 0 {
                session.history.push(Turn::user(format!("user {i}"), turn_at));
            } else {
                session
                    .history
                    .push(Turn::assistant(format!("reply {i}"), turn_at, None));
            }
        }
        session
    }

    fn spec() -> ModelSpec {
        test_config().models["default"].clone()
    }

    #[test]
    fn test_estimate_counts_chars() {
        assert_eq!(estimate_tokens("abcd"), 8);
        assert_eq!(estimate_tokens("你好"), 4);
    }

    #[test]
    fn test_full_history_within_budget() {
        let session = session_with_history(6);
        let messages = build_context(&session, &spec(), &[]);
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_budget_keeps_contiguous_suffix() {
        let mut session = session_with_history(10);
        // Each "user N"/"reply N" turn costs ~14 tokens; admit ~3 turns.
        session.token_budget_override = Some(45);
        let messages = build_context(&session, &spec(), &[]);
        assert!(!messages.is_empty());
        assert!(messages.len() < 10);

        // The kept turns are the newest ones, in chronological order.
        let last = messages.last().unwrap();
        assert!(last.content.contains("reply 9"));
        let total: u32 = session.history[10 - messages.len()..]
            .iter()
            .map(|t| estimate_tokens(&t.content))
            .sum();
        assert!(total <= 45);
    }

    #[test]
    fn test_budget_monotonicity() {
        let mut session = session_with_history(20);
        let mut previous = usize::MAX;
        for budget in [400, 200, 100, 50, 20] {
            session.token_budget_override = Some(budget);
            let len = build_context(&session, &spec(), &[]).len();
            assert!(len <= previous, "budget {budget} grew the window");
            previous = len;
        }
    }

    #[test]
    fn test_round_limit_truncates_before_budget() {
        let mut session = session_with_history(10);
        session.round_limit_override = Some(2);
        let messages = build_context(&session, &spec(), &[]);
        assert_eq!(messages.len(), 4);
        assert!(messages[0].content.contains("user 6"));
    }

    #[test]
    fn test_extra_turns_are_newest() {
        let session = session_with_history(4);
        let extra = Turn::user("fresh", at(2026, 3, 1, 13, 0, 0));
        let messages = build_context(&session, &spec(), std::slice::from_ref(&extra));
        assert_eq!(messages.len(), 5);
        assert!(messages.last().unwrap().content.contains("fresh"));
    }

    #[test]
    fn test_recent_turns_are_labeled_older_are_not() {
        let session = session_with_history(30);
        let messages = build_context(&session, &spec(), &[]);
        assert_eq!(messages.len(), 30);
        // First ten turns predate the labeled window.
        assert!(!messages[0].content.starts_with('['));
        assert!(!messages[9].content.starts_with('['));
        // The newest twenty carry "[MM-DD HH:MM] " labels.
        assert!(messages[10].content.starts_with("[03-01 "));
        assert!(messages[29].content.starts_with("[03-01 "));
    }

    #[test]
    fn test_zero_budget_returns_empty() {
        let mut session = session_with_history(4);
        session.token_budget_override = Some(0);
        assert!(build_context(&session, &spec(), &[]).is_empty());
    }
}
