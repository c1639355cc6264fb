//! Summarization backends, registry, and the invoker facade.
//!
//! Backends are interchangeable behind [`SummaryBackend`]; the invoker in
//! [`invoker`] owns mode selection, the short-transcript guard, the fallback
//! chain, and the degrade path, so callers only ever see a usable
//! [`crate::types::SummaryResult`].

pub mod extractive;
pub mod invoker;
pub mod registry;
pub mod structured;

use crate::types::SummaryText;

pub use invoker::{summarize, SummarizeOptions};
pub use registry::BackendRegistry;

pub const MODE_EXTRACTIVE: &str = "extractive";
pub const MODE_STRUCTURED: &str = "structured";

/// What a backend hands back before normalization. Items stay as loose JSON
/// maps here; the invoker maps them into `ActionItem`s so backends don't
/// need to agree on field names.
#[derive(Debug, Clone)]
pub struct RawSummary {
    pub summary: SummaryText,
    pub items: Vec<serde_json::Value>,
}

/// A summarization backend. Implementations must be cheap to call across
/// threads; expensive setup belongs in the registry's load path.
pub trait SummaryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Summarize pre-chunked transcript text. Errors are plain strings the
    /// invoker folds into its fallback chain.
    fn summarize(&self, chunks: &[String]) -> Result<RawSummary, String>;
}

impl std::fmt::Debug for dyn SummaryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryBackend")
            .field("name", &self.name())
            .finish()
    }
}
