//! Transcript normalization and chunking.
//!
//! Raw meeting transcripts arrive full of speaker labels, timestamps, and
//! filler words. This module cleans them into lowercase plain text and splits
//! the result into word-bounded chunks sized for the summarization backends.
//! Pure text-to-text; no model calls and no I/O.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Default chunk window, in whitespace-delimited words.
pub const DEFAULT_CHUNK_WORDS: usize = 1500;

// Compile-once regex patterns via OnceLock.
fn re_timestamp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d{1,2}:\d{2}(:\d{2})?\]").unwrap())
}

fn re_speaker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[A-Za-z]+ ?\d*:").unwrap())
}

fn re_filler() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(um|uh|you know|like|okay|so|well)\b").unwrap()
    })
}

fn re_special() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Keep word chars, whitespace, and sentence punctuation only.
    RE.get_or_init(|| Regex::new(r"[^\w\s.,?!]").unwrap())
}

fn re_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

// Contractions are expanded before filler removal so that e.g. "can't"
// survives as "cannot" rather than losing its suffix to the special-char
// strip. Specific forms first, generic "n't" last.
const CONTRACTIONS: &[(&str, &str)] = &[
    ("can't", "cannot"),
    ("won't", "will not"),
    ("n't", " not"),
    ("'re", " are"),
    ("'s", " is"),
    ("'d", " would"),
    ("'ll", " will"),
    ("'ve", " have"),
    ("'m", " am"),
];

/// Normalize one raw transcript into clean lowercase text.
///
/// Order matters: Unicode NFKC first, then lowercasing, contraction
/// expansion, structural noise (timestamps, speaker labels), fillers,
/// remaining special characters, and finally whitespace collapse.
pub fn normalize(raw: &str) -> String {
    let mut text: String = raw.nfkc().collect::<String>().to_lowercase();

    for (from, to) in CONTRACTIONS {
        text = text.replace(from, to);
    }

    let text = re_timestamp().replace_all(&text, " ");
    let text = re_speaker().replace_all(&text, " ");
    let text = re_filler().replace_all(&text, " ");
    let text = re_special().replace_all(&text, " ");
    let text = re_whitespace().replace_all(&text, " ");

    text.trim().to_string()
}

/// Split normalized text into consecutive windows of at most `chunk_words`
/// words. The final chunk holds the remainder; word order is preserved and
/// no words are dropped. Empty or whitespace-only input yields no chunks.
pub fn chunk(text: &str, chunk_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let window = chunk_words.max(1);
    words
        .chunks(window)
        .map(|w| w.join(" "))
        .collect()
}

/// Normalize then chunk, the way the preprocess stage consumes transcripts.
pub fn preprocess(raw: &str, chunk_words: usize) -> Vec<String> {
    chunk(&normalize(raw), chunk_words)
}

/// Preprocess a batch of transcripts into one flat chunk list, skipping
/// blank entries. With `normalize_text` off, transcripts are chunked as-is
/// (useful when the caller already cleaned them).
pub fn chunk_transcripts(
    transcripts: &[String],
    chunk_words: usize,
    normalize_text: bool,
) -> Vec<String> {
    let mut chunks = Vec::new();
    for raw in transcripts {
        if raw.trim().is_empty() {
            continue;
        }
        if normalize_text {
            chunks.extend(preprocess(raw, chunk_words));
        } else {
            chunks.extend(chunk(raw.trim(), chunk_words));
        }
    }
    log::debug!(
        "Preprocessed {} transcript(s) into {} chunk(s)",
        transcripts.len(),
        chunks.len()
    );
    chunks
}
