//! Core data model for the meeting pipeline.
//!
//! Everything here is created fresh per pipeline invocation and discarded
//! after the response is returned. The only cross-call "persistence" is
//! whatever the caller echoes back in the next request's `context` — the
//! orchestrator itself holds no session state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Calendar
// =============================================================================

/// External calendar entity. Read-only input to the pipeline; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

/// Derive the transcript text for one event: description when present,
/// otherwise the title. One transcript per selected event.
pub fn transcript_from_event(event: &CalendarEvent) -> String {
    let body = event.description.trim();
    if body.is_empty() {
        event.title.trim().to_string()
    } else {
        body.to_string()
    }
}

// =============================================================================
// Action items
// =============================================================================

/// Issue type for created tickets. Small fixed set; `Task` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IssueType {
    #[default]
    Task,
    Story,
    Bug,
}

impl IssueType {
    /// Parse upstream issue-type labels; anything unrecognized maps to Task.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "story" => IssueType::Story,
            "bug" => IssueType::Bug,
            _ => IssueType::Task,
        }
    }
}

/// A task-like statement extracted from a transcript or produced by a
/// summarization backend. Backends emit loose `title`/`owner`/`due` maps;
/// the summarization invoker normalizes them to this shape before anything
/// downstream sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(alias = "title")]
    pub summary: String,
    #[serde(default, alias = "owner", skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub issue_type: IssueType,
    #[serde(default, alias = "due", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u8>,
}

impl ActionItem {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            assignee: None,
            issue_type: IssueType::Task,
            due_date: None,
            story_points: None,
        }
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Summary text is either a single string (extractive backend) or a list of
/// bullet strings (structured backend). Callers render both the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryText {
    Text(String),
    Bullets(Vec<String>),
}

impl SummaryText {
    /// Flatten to a single string for scanning and notification bodies.
    pub fn joined(&self) -> String {
        match self {
            SummaryText::Text(s) => s.clone(),
            SummaryText::Bullets(items) => items.join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SummaryText::Text(s) => s.trim().is_empty(),
            SummaryText::Bullets(items) => items.is_empty(),
        }
    }
}

/// One summarization invocation's output. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: SummaryText,
    pub action_items: Vec<ActionItem>,
    /// Backend mode that actually produced the result (may differ from the
    /// requested mode after a fallback).
    pub mode: String,
}

// =============================================================================
// Risks
// =============================================================================

/// Risk category. Distinguishes provenance: tracker-sourced categories vs.
/// `TextSignal` records from summary-text triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    Overdue,
    Unassigned,
    Blocked,
    NoDueDate,
    Stale,
    HighPriority,
    TextSignal,
}

/// A single detected risk. Sources are concatenated, never deduplicated
/// against each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRecord {
    #[serde(rename = "type")]
    pub kind: RiskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl RiskRecord {
    /// Bare tracker risk with just a category, issue key, and description.
    pub fn tracker(kind: RiskKind, key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            key: Some(key.into()),
            description: description.into(),
            summary: None,
            severity: None,
            due_date: None,
            last_updated: None,
        }
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// Per-item outcome of the ticket-creation stage. One record per action item,
/// success or failure — one failing item never voids the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketOutcome {
    pub title: String,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Created,
    Failed,
}

/// A ticket as returned by the tracker on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// An open issue as returned by tracker risk queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerIssue {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

// =============================================================================
// Stages
// =============================================================================

/// The named steps of the meeting pipeline, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Fetch,
    Preprocess,
    Summarize,
    TicketCreation,
    RiskDetection,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Preprocess => "preprocess",
            Stage::Summarize => "summarize",
            Stage::TicketCreation => "ticket-creation",
            Stage::RiskDetection => "risk-detection",
            Stage::Notify => "notify",
        }
    }

    /// Suggested follow-up stages, in pipeline order.
    pub fn next_actions(&self) -> Vec<Stage> {
        match self {
            Stage::Fetch => vec![Stage::Preprocess],
            Stage::Preprocess => vec![Stage::Summarize],
            Stage::Summarize => vec![Stage::TicketCreation, Stage::RiskDetection],
            Stage::TicketCreation => vec![Stage::RiskDetection],
            Stage::RiskDetection => vec![Stage::Notify],
            Stage::Notify => vec![],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fetch" => Ok(Stage::Fetch),
            "preprocess" => Ok(Stage::Preprocess),
            "summarize" => Ok(Stage::Summarize),
            "ticket-creation" => Ok(Stage::TicketCreation),
            "risk-detection" => Ok(Stage::RiskDetection),
            "notify" => Ok(Stage::Notify),
            _ => Err(()),
        }
    }
}

// =============================================================================
// Request / carried context
// =============================================================================

/// Prior stage outputs the caller echoes back. This is the statelessness
/// contract: the orchestrator reads carried state from here instead of any
/// server-held session, and callers may re-run a stage with overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarriedContext {
    pub calendar_events: Vec<CalendarEvent>,
    pub calendar_transcripts: Vec<String>,
    pub processed_transcripts: Vec<String>,
    pub summaries: Vec<SummaryText>,
    pub action_items: Vec<ActionItem>,
    pub tickets: Vec<TicketOutcome>,
    pub risks: Vec<RiskRecord>,
}

/// One orchestrator call. An explicit `stage` wins over free-text inference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrchestrateRequest {
    pub query: Option<String>,
    pub stage: Option<String>,
    pub mode: Option<String>,
    pub selected_event_indices: Option<Vec<usize>>,
    pub processed_transcripts: Option<Vec<String>>,
    pub selected_action_items: Option<Vec<ActionItem>>,
    pub context: CarriedContext,
}

// =============================================================================
// Result envelope
// =============================================================================

/// The orchestrator's sole output type. A common `{stage, error,
/// next_actions}` base with one flattened body variant per stage, so callers
/// can pattern-match on the body before touching stage-specific fields.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub stage: String,
    #[serde(flatten)]
    pub body: StageBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<Stage>,
}

impl Envelope {
    pub fn new(stage: Stage, body: StageBody) -> Self {
        Self {
            stage: stage.as_str().to_string(),
            body,
            error: None,
            next_actions: stage.next_actions(),
        }
    }

    /// Envelope for an unrecognized stage name. Never raised to the caller.
    pub fn unknown_stage(name: &str) -> Self {
        Self {
            stage: name.to_string(),
            body: StageBody::Empty {},
            error: Some(format!("Unknown stage: {}", name)),
            next_actions: Vec::new(),
        }
    }

    /// Business-logic failure at a known stage (missing inputs, collaborator
    /// down). Still HTTP 200 — the error travels inside the envelope.
    pub fn stage_error(stage: Stage, error: impl Into<String>) -> Self {
        Self {
            stage: stage.as_str().to_string(),
            body: StageBody::Empty {},
            error: Some(error.into()),
            next_actions: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Stage-specific payloads, flattened into the envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StageBody {
    Fetch {
        calendar_events: Vec<CalendarEvent>,
        calendar_transcripts: Vec<String>,
        event_count: usize,
        transcript_count: usize,
    },
    Preprocess {
        selected_events: Vec<CalendarEvent>,
        processed_transcripts: Vec<String>,
        processed_transcript_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        preprocessing_error: Option<String>,
    },
    Summarize {
        summaries: Vec<SummaryText>,
        summary_count: usize,
        action_items: Vec<ActionItem>,
        mode: String,
    },
    Tickets {
        tickets: Vec<TicketOutcome>,
    },
    Risks {
        risks: Vec<RiskRecord>,
    },
    Notify {
        notified: bool,
    },
    /// Whole-pipeline output of the batch workflow path.
    Workflow {
        calendar_events: Vec<CalendarEvent>,
        calendar_transcripts: Vec<String>,
        summaries: Vec<SummaryText>,
        action_items: Vec<ActionItem>,
        risks: Vec<RiskRecord>,
        tickets: Vec<TicketOutcome>,
        notified: bool,
    },
    /// Single requested field, from the query-to-field shortcut.
    Field(serde_json::Map<String, serde_json::Value>),
    Empty {},
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stage_round_trip() {
        for name in [
            "fetch",
            "preprocess",
            "summarize",
            "ticket-creation",
            "risk-detection",
            "notify",
        ] {
            let stage: Stage = name.parse().unwrap();
            assert_eq!(stage.as_str(), name);
        }
        assert!("jira".parse::<Stage>().is_err());
    }

    #[test]
    fn test_unknown_stage_envelope_shape() {
        let env = Envelope::unknown_stage("bogus");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["stage"], "bogus");
        assert_eq!(json["error"], "Unknown stage: bogus");
        // Empty body and empty next_actions contribute no fields
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_action_item_accepts_upstream_aliases() {
        let item: ActionItem = serde_json::from_str(
            r#"{"title": "Prepare the demo", "owner": "Alice", "due": "Friday"}"#,
        )
        .unwrap();
        assert_eq!(item.summary, "Prepare the demo");
        assert_eq!(item.assignee.as_deref(), Some("Alice"));
        assert_eq!(item.due_date.as_deref(), Some("Friday"));
        assert_eq!(item.issue_type, IssueType::Task);
    }

    #[test]
    fn test_summary_text_untagged() {
        let text: SummaryText = serde_json::from_str(r#""one line""#).unwrap();
        assert_eq!(text, SummaryText::Text("one line".to_string()));
        let bullets: SummaryText = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(bullets.joined(), "a\nb");
    }

    #[test]
    fn test_transcript_prefers_description() {
        let event = CalendarEvent {
            id: "evt-001".to_string(),
            title: "Kickoff".to_string(),
            start: Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap(),
            description: "Discuss project scope.".to_string(),
            attendees: vec![],
        };
        assert_eq!(transcript_from_event(&event), "Discuss project scope.");

        let mut bare = event.clone();
        bare.description = "  ".to_string();
        assert_eq!(transcript_from_event(&bare), "Kickoff");
    }

    #[test]
    fn test_risk_kind_wire_names() {
        let record = RiskRecord::tracker(RiskKind::NoDueDate, "MF-7", "Task has no due date.");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "no_due_date");
        assert_eq!(json["key"], "MF-7");
    }

    #[test]
    fn test_next_actions_follow_pipeline_order() {
        assert_eq!(Stage::Fetch.next_actions(), vec![Stage::Preprocess]);
        assert_eq!(
            Stage::Summarize.next_actions(),
            vec![Stage::TicketCreation, Stage::RiskDetection]
        );
        assert!(Stage::Notify.next_actions().is_empty());
    }
}
