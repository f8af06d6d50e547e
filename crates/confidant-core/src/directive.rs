//! Directive parser for engine replies.
//!
//! An engine reply is plain text optionally carrying `[[tag ...]]`
//! control markup. Extraction runs in a fixed priority order, and each
//! match's span is removed from the text before the next tag class is
//! scanned, so spans can never overlap:
//!
//! 1. `[[do-not-send]]` anywhere suppresses the whole reply;
//! 2. `[[memory]] <text>` (body runs to the next `[[` or end of text);
//! 3. `[[followup]] <text>` / `[[followup N-minutes]] <text>` (same
//!    body rule, at most one honored);
//! 4. `[[schedule HH:MM text]]` / `[[schedule MM-DD HH:MM text]]` /
//!    `[[schedule YYYY-MM-DD HH:MM text]]`;
//! 5. `[[miss HH:MM text]]` / `[[miss N-hours text]]`.
//!
//! A tag whose arguments do not parse is left in place rather than
//! raising; the reply is still delivered. After all tags are stripped,
//! anything matching the relay's own timestamp-label shape is removed
//! so the engine can never forge labels, and the remaining text is
//! split on the `|||` delimiter into ordered visible fragments.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime};
use regex::Regex;

use confidant_types::schedule::ScheduleKind;

/// Literal separator between fragments of a multi-part reply.
pub const MULTIPART_DELIMITER: &str = "|||";

/// Sentinel that suppresses the whole reply.
pub const SUPPRESS_SENTINEL: &str = "[[do-not-send]]";

/// Default follow-up delay when `[[followup]]` carries no duration.
pub const DEFAULT_FOLLOWUP_DELAY_MINUTES: i64 = 5;

static MEMORY_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[memory\]\]").expect("valid regex"));
static FOLLOWUP_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[followup(?:\s+(\d+)-minutes?)?\]\]").expect("valid regex"));
static SCHEDULE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[schedule\s+([^\]]+)\]\]").expect("valid regex"));
static MISS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[miss\s+([^\]]+)\]\]").expect("valid regex"));
static TIME_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid regex"));
static MONTH_DAY_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})$").expect("valid regex"));
static FULL_DATE_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid regex"));
static HOURS_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-hours?$").expect("valid regex"));
static TIMESTAMP_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d{2}-\d{2} \d{2}:\d{2}\]\s*").expect("valid regex"));

/// A `[[followup]]` directive awaiting installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpDirective {
    pub text: String,
    pub delay_minutes: i64,
}

/// A `[[schedule]]` or `[[miss]]` directive awaiting installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDirective {
    pub kind: ScheduleKind,
    pub fire_on: NaiveDate,
    pub fire_at: NaiveTime,
    pub hint: String,
}

/// Everything decoded from one engine reply.
#[derive(Debug, Clone, Default)]
pub struct ParsedReply {
    /// Visible reply text with all tags stripped; still contains the
    /// multi-part delimiter.
    pub visible: String,
    pub notes: Vec<String>,
    pub follow_up: Option<FollowUpDirective>,
    pub schedules: Vec<ScheduleDirective>,
    pub suppressed: bool,
}

impl ParsedReply {
    /// The visible reply split into ordered, non-empty fragments.
    pub fn fragments(&self) -> Vec<&str> {
        self.visible
            .split(MULTIPART_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Decode one engine reply. `now` anchors duration-form directives.
pub fn parse(reply: &str, now: DateTime<FixedOffset>) -> ParsedReply {
    if reply.contains(SUPPRESS_SENTINEL) {
        return ParsedReply {
            suppressed: true,
            ..ParsedReply::default()
        };
    }

    let today = now.date_naive();

    let (text, memory_bodies) = extract_tail_tags(reply, &MEMORY_HEAD);
    let notes: Vec<String> = memory_bodies
        .into_iter()
        .filter_map(|(_, body)| (!body.is_empty()).then_some(body))
        .collect();

    let (text, followup_bodies) = extract_tail_tags(&text, &FOLLOWUP_HEAD);
    // At most one follow-up is honored; extras were still stripped.
    let follow_up = followup_bodies
        .into_iter()
        .find(|(_, body)| !body.is_empty())
        .map(|(arg, body)| FollowUpDirective {
            text: body,
            delay_minutes: arg
                .and_then(|minutes| minutes.parse().ok())
                .unwrap_or(DEFAULT_FOLLOWUP_DELAY_MINUTES),
        });

    let mut schedules = Vec::new();
    let text = extract_bracket_tags(&text, &SCHEDULE_TAG, |args| {
        let parsed = parse_schedule_args(args, today)?;
        schedules.push(ScheduleDirective {
            kind: ScheduleKind::Clock,
            fire_on: parsed.0,
            fire_at: parsed.1,
            hint: parsed.2,
        });
        Some(())
    });
    let text = extract_bracket_tags(&text, &MISS_TAG, |args| {
        let parsed = parse_miss_args(args, now)?;
        schedules.push(ScheduleDirective {
            kind: ScheduleKind::InactivityDeferred,
            fire_on: parsed.0,
            fire_at: parsed.1,
            hint: parsed.2,
        });
        Some(())
    });

    let visible = TIMESTAMP_LABEL.replace_all(&text, "").trim().to_string();

    ParsedReply {
        visible,
        notes,
        follow_up,
        schedules,
        suppressed: false,
    }
}

/// Extract every tag whose body runs from the tag head to the next `[[`
/// or end of text. Returns the remaining text and `(head-arg, body)`
/// pairs in match order.
fn extract_tail_tags(text: &str, head: &Regex) -> (String, Vec<(Option<String>, String)>) {
    let mut remaining = text.to_string();
    let mut found = Vec::new();

    while let Some(caps) = head.captures(&remaining) {
        let whole = caps.get(0).expect("group 0 always present");
        let arg = caps.get(1).map(|m| m.as_str().to_string());
        let body_start = whole.end();
        let body_end = remaining[body_start..]
            .find("[[")
            .map_or(remaining.len(), |i| body_start + i);
        let body = remaining[body_start..body_end].trim().to_string();
        remaining.replace_range(whole.start()..body_end, "");
        found.push((arg, body));
    }

    (remaining, found)
}

/// Remove every self-contained `[[tag args]]` span whose args the
/// callback accepts; spans the callback rejects stay in the text.
fn extract_bracket_tags(
    text: &str,
    tag: &Regex,
    mut accept: impl FnMut(&str) -> Option<()>,
) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for caps in tag.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let args = caps.get(1).expect("tag regex has one group").as_str();
        if accept(args.trim()).is_some() {
            result.push_str(&text[last..whole.start()]);
            last = whole.end();
        }
    }
    result.push_str(&text[last..]);
    result
}

/// Parse `HH:MM text`, `MM-DD HH:MM text`, or `YYYY-MM-DD HH:MM text`.
fn parse_schedule_args(args: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveTime, String)> {
    let (first, rest) = split_word(args)?;

    if let Some(time) = parse_time(first) {
        let hint = non_empty(rest)?;
        return Some((today, time, hint.to_string()));
    }

    let date = if let Some(caps) = MONTH_DAY_ARG.captures(first) {
        NaiveDate::from_ymd_opt(
            today.year(),
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        )?
    } else if let Some(caps) = FULL_DATE_ARG.captures(first) {
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?
    } else {
        return None;
    };

    let (second, rest) = split_word(rest)?;
    let time = parse_time(second)?;
    let hint = non_empty(rest)?;
    Some((date, time, hint.to_string()))
}

/// Parse `HH:MM text` (today) or `N-hours text` (relative to now).
fn parse_miss_args(
    args: &str,
    now: DateTime<FixedOffset>,
) -> Option<(NaiveDate, NaiveTime, String)> {
    let (first, rest) = split_word(args)?;
    let hint = non_empty(rest)?;

    if let Some(time) = parse_time(first) {
        return Some((now.date_naive(), time, hint.to_string()));
    }

    if let Some(caps) = HOURS_ARG.captures(first) {
        let hours: i64 = caps[1].parse().ok()?;
        let target = now + Duration::hours(hours);
        return Some((target.date_naive(), target.time(), hint.to_string()));
    }

    None
}

fn parse_time(word: &str) -> Option<NaiveTime> {
    let caps = TIME_ARG.captures(word)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(i) => Some((&text[..i], text[i..].trim_start())),
        None => Some((text, "")),
    }
}

fn non_empty(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}
