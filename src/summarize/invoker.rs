//! Summarization facade: guard, mode selection, fallback, degrade.
//!
//! Callers get a usable [`SummaryResult`] from every input. The only
//! responses that skip the backends entirely are the short-transcript guard
//! and the degrade path after every backend has failed.

use crate::summarize::{BackendRegistry, RawSummary, MODE_EXTRACTIVE, MODE_STRUCTURED};
use crate::types::{ActionItem, SummaryResult, SummaryText};

/// Exact guard message for sub-minimum transcripts.
pub const TOO_SHORT: &str = "Transcript too short for summarization.";

/// Minimum words before any backend is invoked.
const MIN_WORDS: usize = 10;
/// Degrade-path excerpt length, in chars.
const DEGRADE_CHARS: usize = 300;

#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    /// Requested backend mode; unset or unregistered falls back to
    /// extractive.
    pub mode: Option<String>,
}

/// Summarize preprocessed transcript chunks.
///
/// Word-count guard first (no backend touched), then the requested backend,
/// then the surviving alternative, then the degrade excerpt. Never fails.
pub fn summarize(
    registry: &BackendRegistry,
    chunks: &[String],
    options: &SummarizeOptions,
) -> SummaryResult {
    let text = chunks.join(" ");
    if text.split_whitespace().count() < MIN_WORDS {
        log::info!("Transcript below {} words; skipping summarization", MIN_WORDS);
        return SummaryResult {
            summary: SummaryText::Text(TOO_SHORT.to_string()),
            action_items: Vec::new(),
            mode: "none".to_string(),
        };
    }

    let mut failures: Vec<String> = Vec::new();
    for mode in mode_chain(options.mode.as_deref(), registry) {
        let backend = match registry.get_or_load(mode) {
            Ok(backend) => backend,
            Err(error) => {
                failures.push(format!("{}: {}", mode, error));
                continue;
            }
        };
        match backend.summarize(chunks) {
            Ok(raw) => {
                if !failures.is_empty() {
                    log::warn!(
                        "Summarization fell back to '{}' after: {}",
                        mode,
                        failures.join("; ")
                    );
                }
                return finish(raw, mode);
            }
            Err(error) => {
                log::warn!("Backend '{}' failed: {}", mode, error);
                failures.push(format!("{}: {}", mode, error));
            }
        }
    }

    degrade(&text, &failures)
}

/// Requested mode first, then the other registered backend. Unknown or
/// unset requests start at extractive.
fn mode_chain<'a>(requested: Option<&'a str>, registry: &BackendRegistry) -> Vec<&'a str> {
    let primary = match requested {
        Some(mode) if registry.is_registered(mode) => mode,
        Some(mode) => {
            log::warn!("Requested mode '{}' not registered; using extractive", mode);
            MODE_EXTRACTIVE
        }
        None => MODE_EXTRACTIVE,
    };
    let mut chain = vec![primary];
    for alternative in [MODE_EXTRACTIVE, MODE_STRUCTURED] {
        if alternative != primary && registry.is_registered(alternative) {
            chain.push(alternative);
        }
    }
    chain
}

/// Map a backend's loose items into `ActionItem`s. Items that don't fit the
/// shape are dropped, not fatal.
fn finish(raw: RawSummary, mode: &str) -> SummaryResult {
    let action_items: Vec<ActionItem> = raw
        .items
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    SummaryResult {
        summary: raw.summary,
        action_items,
        mode: mode.to_string(),
    }
}

/// Total-failure path: a leading excerpt of the input stands in for the
/// summary so the caller still has something to show.
fn degrade(text: &str, failures: &[String]) -> SummaryResult {
    log::error!("All summarization backends failed: {}", failures.join("; "));
    let excerpt = if text.chars().count() > DEGRADE_CHARS {
        let cut: String = text.chars().take(DEGRADE_CHARS).collect();
        format!("{}...", cut)
    } else {
        format!("{} (summarization unavailable: {})", text, failures.join("; "))
    };
    SummaryResult {
        summary: SummaryText::Text(excerpt),
        action_items: Vec::new(),
        mode: "degraded".to_string(),
    }
}
