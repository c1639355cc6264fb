//! Structured backend over a black-box completion client.
//!
//! Each transcript chunk is sent through a [`CompletionClient`] with a
//! JSON-demanding prompt. Responses are treated as hostile: the parser scans
//! for the last balanced JSON object, falls back to a bullet-line scan when
//! no JSON survives, filters placeholder output, and deduplicates across
//! chunks. A malformed response never propagates as an error; it just
//! contributes nothing.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::summarize::{RawSummary, SummaryBackend, MODE_STRUCTURED};
use crate::types::SummaryText;

/// Re-chunk window applied to oversized chunks before prompting.
const PROMPT_CHUNK_WORDS: usize = 900;
/// Chunks below this word count are skipped entirely.
const MIN_CHUNK_WORDS: usize = 10;

/// The LLM seam. One method, plain strings both ways; transport, retries,
/// and model choice all live behind implementations.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, String>;
}

fn re_bullet_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(?:-|\d+\.|•)\s+(.+)$").unwrap())
}

fn re_placeholder_point() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^point \d+$").unwrap())
}

pub struct StructuredBackend {
    client: Box<dyn CompletionClient>,
}

impl StructuredBackend {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

impl SummaryBackend for StructuredBackend {
    fn name(&self) -> &'static str {
        MODE_STRUCTURED
    }

    fn summarize(&self, chunks: &[String]) -> Result<RawSummary, String> {
        let prompt_chunks = prepare_chunks(chunks);
        if prompt_chunks.is_empty() {
            return Err("No text to summarize".to_string());
        }

        let mut bullets: Vec<String> = Vec::new();
        let mut items: Vec<Value> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut failures = 0usize;

        for (index, chunk) in prompt_chunks.iter().enumerate() {
            let response = match self.client.complete(&build_prompt(chunk)) {
                Ok(response) => response,
                Err(error) => {
                    log::warn!("Completion failed for chunk {}: {}", index, error);
                    failures += 1;
                    continue;
                }
            };

            let parsed = parse_response(&response);
            for bullet in parsed.bullets {
                if is_placeholder(&bullet) {
                    continue;
                }
                if seen.insert(format!("s:{}", bullet.trim().to_lowercase())) {
                    bullets.push(bullet);
                }
            }
            for item in parsed.items {
                if item_is_placeholder(&item) {
                    continue;
                }
                let canonical = serde_json::to_string(&item).unwrap_or_default();
                if seen.insert(format!("j:{}", canonical)) {
                    items.push(item);
                }
            }
        }

        if failures == prompt_chunks.len() {
            return Err(format!(
                "All {} completion call(s) failed",
                prompt_chunks.len()
            ));
        }

        Ok(RawSummary {
            summary: SummaryText::Bullets(bullets),
            items,
        })
    }
}

/// Drop sub-minimum chunks and re-window anything over the prompt budget.
fn prepare_chunks(chunks: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in chunks {
        let words: Vec<&str> = chunk.split_whitespace().collect();
        if words.len() < MIN_CHUNK_WORDS {
            continue;
        }
        if words.len() <= PROMPT_CHUNK_WORDS {
            out.push(words.join(" "));
        } else {
            out.extend(words.chunks(PROMPT_CHUNK_WORDS).map(|w| w.join(" ")));
        }
    }
    out
}

fn build_prompt(chunk: &str) -> String {
    format!(
        "Summarize this meeting transcript as JSON with two keys: \
         \"summary\" (a list of bullet strings) and \"action_items\" (a list \
         of objects with \"title\", \"owner\", and \"due\"). Respond with \
         JSON only.\n\nTranscript:\n{}",
        chunk
    )
}

struct ParsedResponse {
    bullets: Vec<String>,
    items: Vec<Value>,
}

/// Pull structure out of a model response: last balanced JSON object first,
/// bullet-line scan when that fails.
fn parse_response(response: &str) -> ParsedResponse {
    if let Some(object) = last_json_object(response) {
        let bullets = match object.get("summary") {
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        };
        let items = match object.get("action_items") {
            Some(Value::Array(list)) => list.clone(),
            _ => Vec::new(),
        };
        return ParsedResponse { bullets, items };
    }

    log::warn!("No JSON object in completion response; falling back to bullet scan");
    let bullets = re_bullet_line()
        .captures_iter(response)
        .map(|caps| caps[1].trim().to_string())
        .collect();
    ParsedResponse {
        bullets,
        items: Vec::new(),
    }
}

/// Find the last balanced top-level `{...}` in the text and parse it.
/// String-literal braces are ignored while counting.
fn last_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            candidates.push(&text[s..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    candidates
        .into_iter()
        .rev()
        .find_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
}

fn is_placeholder(bullet: &str) -> bool {
    let trimmed = bullet.trim();
    trimmed.is_empty() || trimmed.starts_with('<') || re_placeholder_point().is_match(trimmed)
}

fn item_is_placeholder(item: &Value) -> bool {
    match item {
        Value::String(s) => is_placeholder(s),
        Value::Object(map) => match map.get("title").or_else(|| map.get("summary")) {
            Some(Value::String(title)) => is_placeholder(title),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted client: pops canned responses in order.
    struct ScriptedClient {
        responses: Mutex<Vec<Result<String, String>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete(&self, _prompt: &str) -> Result<String, String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err("script exhausted".to_string())
            } else {
                responses.remove(0)
            }
        }
    }

    fn chunk_of(words: usize) -> String {
        (0..words).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_parses_last_json_object() {
        let response = r#"Here you go: {"note": "draft"} and the final answer
            {"summary": ["Release slipped one week."], "action_items":
            [{"title": "Update the timeline", "owner": "Ana"}]}"#;
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![Ok(
            response.to_string(),
        )])));
        let raw = backend.summarize(&[chunk_of(20)]).unwrap();
        assert_eq!(
            raw.summary,
            SummaryText::Bullets(vec!["Release slipped one week.".to_string()])
        );
        assert_eq!(raw.items.len(), 1);
        assert_eq!(raw.items[0]["title"], "Update the timeline");
    }

    #[test]
    fn test_bullet_scan_fallback() {
        let response = "No JSON today.\n- First takeaway\n2. Second takeaway\n• Third takeaway";
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![Ok(
            response.to_string(),
        )])));
        let raw = backend.summarize(&[chunk_of(20)]).unwrap();
        assert_eq!(
            raw.summary,
            SummaryText::Bullets(vec![
                "First takeaway".to_string(),
                "Second takeaway".to_string(),
                "Third takeaway".to_string(),
            ])
        );
    }

    #[test]
    fn test_placeholders_are_filtered() {
        let response = r#"{"summary": ["<insert summary>", "point 3", "", "Real bullet"],
            "action_items": [{"title": "<placeholder>"}, {"title": "Ship it"}]}"#;
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![Ok(
            response.to_string(),
        )])));
        let raw = backend.summarize(&[chunk_of(20)]).unwrap();
        assert_eq!(
            raw.summary,
            SummaryText::Bullets(vec!["Real bullet".to_string()])
        );
        assert_eq!(raw.items.len(), 1);
        assert_eq!(raw.items[0]["title"], "Ship it");
    }

    #[test]
    fn test_cross_chunk_dedup() {
        let first = r#"{"summary": ["Budget approved."], "action_items": [{"title": "File report"}]}"#;
        let second = r#"{"summary": ["  budget APPROVED. "], "action_items": [{"title": "File report"}]}"#;
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![
            Ok(first.to_string()),
            Ok(second.to_string()),
        ])));
        let raw = backend
            .summarize(&[chunk_of(20), chunk_of(30)])
            .unwrap();
        assert_eq!(raw.summary.joined(), "Budget approved.");
        assert_eq!(raw.items.len(), 1);
    }

    #[test]
    fn test_short_chunks_are_skipped() {
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![])));
        // 9 words: below minimum, never reaches the client
        assert!(backend.summarize(&[chunk_of(9)]).is_err());
    }

    #[test]
    fn test_oversized_chunk_is_rewindowed() {
        let chunks = prepare_chunks(&[chunk_of(2000)]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split_whitespace().count(), 900);
        assert_eq!(chunks[2].split_whitespace().count(), 200);
    }

    #[test]
    fn test_partial_completion_failure_still_returns() {
        let ok = r#"{"summary": ["Kept bullet."], "action_items": []}"#;
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![
            Err("timeout".to_string()),
            Ok(ok.to_string()),
        ])));
        let raw = backend
            .summarize(&[chunk_of(20), chunk_of(30)])
            .unwrap();
        assert_eq!(raw.summary.joined(), "Kept bullet.");
    }

    #[test]
    fn test_all_completions_failing_is_an_error() {
        let backend = StructuredBackend::new(Box::new(ScriptedClient::new(vec![
            Err("down".to_string()),
        ])));
        assert!(backend.summarize(&[chunk_of(20)]).is_err());
    }
}
