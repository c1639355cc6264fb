//! Crate error taxonomy.
//!
//! Three families: missing inputs (the caller skipped a stage), collaborator
//! failures (calendar, tracker, summarization backend, notifier), and
//! unrecognized stage names. The orchestrator is the error boundary: every
//! variant here is folded into an envelope `error` field and never raised
//! past it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    /// A stage was invoked without the inputs an earlier stage produces.
    #[error("{0}")]
    InputMissing(String),

    /// A collaborator call failed (calendar, tracker, backend, notifier).
    #[error("{service} error: {message}")]
    Collaborator { service: &'static str, message: String },

    /// Stage name not in the stage table.
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        FlowError::Collaborator {
            service,
            message: message.into(),
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = FlowError::InputMissing(
            "No transcripts available to summarize. Please fetch and preprocess events first."
                .to_string(),
        );
        assert!(err.to_string().starts_with("No transcripts available"));

        let err = FlowError::collaborator("calendar", "connection refused");
        assert_eq!(err.to_string(), "calendar error: connection refused");

        let err = FlowError::UnknownStage("jira".to_string());
        assert_eq!(err.to_string(), "Unknown stage: jira");
    }
}
