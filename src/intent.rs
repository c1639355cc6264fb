//! Free-text intent inference.
//!
//! Maps a user query to a pipeline stage when the caller didn't name one.
//! The default classifier is a fixed-priority keyword table; the trait seam
//! exists so a smarter classifier can be swapped in without touching the
//! orchestrator.

use crate::types::Stage;

pub trait IntentClassifier: Send + Sync {
    fn classify(&self, query: &str) -> Stage;
}

/// Case-insensitive substring table, checked in priority order. Anything
/// unmatched starts the pipeline from the top.
#[derive(Debug, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }
}

const INTENT_TABLE: &[(&str, Stage)] = &[
    ("process", Stage::Preprocess),
    ("summarize", Stage::Summarize),
    ("summary", Stage::Summarize),
    ("jira", Stage::TicketCreation),
    ("ticket", Stage::TicketCreation),
    ("risk", Stage::RiskDetection),
    ("notify", Stage::Notify),
    ("notification", Stage::Notify),
];

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, query: &str) -> Stage {
        let lower = query.to_lowercase();
        for (keyword, stage) in INTENT_TABLE {
            if lower.contains(keyword) {
                log::debug!("Query matched intent keyword '{}' -> {}", keyword, stage);
                return *stage;
            }
        }
        Stage::Fetch
    }
}
