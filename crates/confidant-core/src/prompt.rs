//! System prompt composition.
//!
//! Every engine call carries the configured persona, the current local
//! time (so the engine can reason about gaps between messages), and the
//! user's long-term notes.

use chrono::{DateTime, FixedOffset};

use confidant_types::memory::MemoryNote;

/// Compose the system prompt for one engine call.
pub fn compose_system_prompt(
    persona: &str,
    notes: &[MemoryNote],
    now: DateTime<FixedOffset>,
) -> String {
    let mut prompt = String::from(persona);

    prompt.push_str(&format!(
        "\n\nCurrent time: {}",
        now.format("%Y-%m-%d %H:%M:%S (%a)")
    ));

    if !notes.is_empty() {
        prompt.push_str("\n\nLong-term notes about the user:");
        for note in notes {
            prompt.push_str(&format!("\n- [{}] {}", note.created_on, note.text));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::at;
    use chrono::NaiveDate;

    #[test]
    fn test_prompt_contains_persona_and_time() {
        let now = at(2026, 3, 1, 9, 30, 0);
        let prompt = compose_system_prompt("Be kind.", &[], now);
        assert!(prompt.starts_with("Be kind."));
        assert!(prompt.contains("Current time: 2026-03-01 09:30:00 (Sun)"));
        assert!(!prompt.contains("Long-term notes"));
    }

    #[test]
    fn test_prompt_lists_notes_with_dates() {
        let now = at(2026, 3, 1, 9, 30, 0);
        let notes = vec![
            MemoryNote {
                created_on: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
                text: "prefers tea".to_string(),
            },
            MemoryNote {
                created_on: NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
                text: "exam on friday".to_string(),
            },
        ];
        let prompt = compose_system_prompt("Be kind.", &notes, now);
        assert!(prompt.contains("- [2026-02-20] prefers tea"));
        assert!(prompt.contains("- [2026-02-27] exam on friday"));
    }
}
