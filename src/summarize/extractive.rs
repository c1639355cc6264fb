//! Deterministic extractive backend.
//!
//! Produces a lead-sentence digest: the opening sentences of the transcript,
//! capped by word budget, as a single string. Action items come from the
//! keyword extractor. No model, no I/O; this is the always-available default
//! backend the structured one falls back to.

use std::sync::OnceLock;

use regex::Regex;

use crate::extract;
use crate::summarize::{RawSummary, SummaryBackend, MODE_EXTRACTIVE};
use crate::types::SummaryText;

/// Word budget for the digest.
const DIGEST_WORDS: usize = 60;

fn re_sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.?!]\s+").unwrap())
}

#[derive(Debug, Default)]
pub struct ExtractiveBackend;

impl ExtractiveBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SummaryBackend for ExtractiveBackend {
    fn name(&self) -> &'static str {
        MODE_EXTRACTIVE
    }

    fn summarize(&self, chunks: &[String]) -> Result<RawSummary, String> {
        let text = chunks.join(" ");
        let text = text.trim();
        if text.is_empty() {
            return Err("No text to summarize".to_string());
        }

        let digest = lead_digest(text, DIGEST_WORDS);
        let items = extract::extract_action_items(text)
            .into_iter()
            .map(|item| serde_json::to_value(item).unwrap_or_default())
            .collect();

        Ok(RawSummary {
            summary: SummaryText::Text(digest),
            items,
        })
    }
}

/// Opening sentences up to `max_words`, always at least one sentence, never
/// cut mid-sentence unless the first sentence alone exceeds the budget.
fn lead_digest(text: &str, max_words: usize) -> String {
    let mut digest = String::new();
    let mut words = 0usize;

    for sentence in split_sentences(text) {
        let sentence_words = sentence.split_whitespace().count();
        if !digest.is_empty() && words + sentence_words > max_words {
            break;
        }
        if !digest.is_empty() {
            digest.push(' ');
        }
        digest.push_str(sentence);
        words += sentence_words;
        if words >= max_words {
            break;
        }
    }

    if words > max_words && digest.split_whitespace().count() > max_words {
        let truncated: Vec<&str> = digest.split_whitespace().take(max_words).collect();
        return format!("{}...", truncated.join(" "));
    }
    digest
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in re_sentence_end().find_iter(text) {
        // Keep the terminator, drop the trailing whitespace.
        out.push(text[last..m.start() + 1].trim());
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_leading_sentences() {
        let chunks = vec![
            "The team reviewed the release plan. Bob will prepare the rollout checklist. \
             Deployment happens next week."
                .to_string(),
        ];
        let raw = ExtractiveBackend::new().summarize(&chunks).unwrap();
        match raw.summary {
            SummaryText::Text(text) => {
                assert!(text.starts_with("The team reviewed the release plan."));
            }
            SummaryText::Bullets(_) => panic!("extractive backend emits a single string"),
        }
        // The extractor fires on "prepare"
        assert_eq!(raw.items.len(), 1);
    }

    #[test]
    fn test_digest_respects_word_budget() {
        let long: Vec<String> = (0..50)
            .map(|i| format!("Sentence number {} talks about planning.", i))
            .collect();
        let chunks = vec![long.join(" ")];
        let raw = ExtractiveBackend::new().summarize(&chunks).unwrap();
        let words = raw.summary.joined().split_whitespace().count();
        assert!(words <= DIGEST_WORDS + 1, "digest too long: {} words", words);
    }

    #[test]
    fn test_oversized_first_sentence_is_cut() {
        let chunks = vec![format!("word {}", "word ".repeat(200))];
        let raw = ExtractiveBackend::new().summarize(&chunks).unwrap();
        let text = raw.summary.joined();
        assert!(text.ends_with("..."));
        assert!(text.split_whitespace().count() <= DIGEST_WORDS);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(ExtractiveBackend::new().summarize(&[]).is_err());
        assert!(ExtractiveBackend::new()
            .summarize(&["   ".to_string()])
            .is_err());
    }
}
