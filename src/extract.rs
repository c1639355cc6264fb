//! Heuristic action-item extraction.
//!
//! Scans transcript sentences for task-like language and pulls out a title,
//! an owner, and a due phrase per hit. Deliberately dependency-light: plain
//! keyword and capitalization heuristics, no model in the loop, so it works
//! offline and serves as the floor the summarization backends build on.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Utc};
use regex::Regex;

use crate::types::ActionItem;

/// Cap on items returned per extraction pass.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Task-signal keywords, matched case-insensitively on whole sentences.
const KEYWORDS: &[&str] = &[
    "assign",
    "action",
    "task",
    "follow up",
    "follow-up",
    "todo",
    "to do",
    "investigate",
    "implement",
    "deliver",
    "create",
    "prepare",
    "fix",
    "verify",
    "test",
    "review",
    "document",
    "schedule",
    "owner",
    "lead",
];

const MAX_TITLE_LEN: usize = 200;

fn re_sentence_split() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.?!]\s+").unwrap())
}

fn re_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn re_modal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(will|shall)\b").unwrap())
}

fn re_owner_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)owner:\s*([A-Z][a-z]+)").unwrap())
}

fn re_owner_assigned() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)assign(?:ed)?(?: to)?\s+([A-Z][a-z]+)").unwrap())
}

fn re_owner_paren() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z][a-z]+)\s*\(").unwrap())
}

fn re_owner_modal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z][a-z]+)\s+(?:will|shall|should|can|must)\b").unwrap())
}

fn re_due_by() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bby\s+([A-Za-z0-9/\-]+)").unwrap())
}

fn re_due_on() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bdue\s+(?:on\s+)?([A-Za-z0-9/\-]+)").unwrap())
}

fn re_speaker_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Alice (PM): ..." style prefixes at sentence start.
    RE.get_or_init(|| Regex::new(r"^[A-Z][a-zA-Z\-]+\s*\([^)]*\):?\s*").unwrap())
}

/// Extract action items from raw transcript text, capped at
/// [`DEFAULT_MAX_ITEMS`].
pub fn extract_action_items(text: &str) -> Vec<ActionItem> {
    extract(text, DEFAULT_MAX_ITEMS)
}

/// Every sentence containing a task keyword or a will/shall modal yields one
/// item, in transcript order, stopping at `max_items`. Text with no task
/// language yields an empty list, never an error.
pub fn extract(text: &str, max_items: usize) -> Vec<ActionItem> {
    let flattened = re_whitespace().replace_all(text.trim(), " ");
    if flattened.is_empty() {
        return Vec::new();
    }

    re_sentence_split()
        .split(&flattened)
        .filter_map(|sentence| {
            let sentence = sentence.trim().trim_end_matches(['.', '?', '!']);
            if sentence.is_empty() || !is_task_sentence(sentence) {
                return None;
            }
            let mut item = ActionItem::new(clean_title(sentence));
            item.assignee = detect_owner(sentence);
            item.due_date = detect_due(sentence);
            Some(item)
        })
        .take(max_items)
        .collect()
}

/// Default due date for an owned item with no due phrase: the upcoming
/// Sunday (end of the current ISO week). Callers that create tickets apply
/// this; extraction itself leaves `due_date` empty.
pub fn end_of_week(now: DateTime<Utc>) -> String {
    let days_left = 6 - i64::from(now.weekday().num_days_from_monday());
    (now + Duration::days(days_left)).format("%Y-%m-%d").to_string()
}

fn is_task_sentence(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    KEYWORDS.iter().any(|kw| lower.contains(kw)) || re_modal().is_match(sentence)
}

/// Owner detection, most explicit signal first: an `owner:` label, then
/// assignment language, then a name with a parenthetical role, then a name
/// followed by a commitment modal.
fn detect_owner(sentence: &str) -> Option<String> {
    for re in [
        re_owner_label(),
        re_owner_assigned(),
        re_owner_paren(),
        re_owner_modal(),
    ] {
        if let Some(caps) = re.captures(sentence) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Due-phrase detection: `by <token>` wins over `due [on] <token>`. The
/// token is kept verbatim ("Friday", "2026-03-01"); no date parsing here.
fn detect_due(sentence: &str) -> Option<String> {
    if let Some(caps) = re_due_by().captures(sentence) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = re_due_on().captures(sentence) {
        return Some(caps[1].to_string());
    }
    None
}

fn clean_title(sentence: &str) -> String {
    let title = re_speaker_prefix().replace(sentence, "");
    let title = title.trim();
    if title.chars().count() > MAX_TITLE_LEN {
        let truncated: String = title.chars().take(MAX_TITLE_LEN - 3).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}
