//! Collaborator seams: calendar, issue tracker, notifier.
//!
//! The pipeline talks to the outside world only through these traits. The
//! implementations here are the dev-mode stand-ins — a fixed calendar, an
//! in-memory tracker, a log-only notifier — so the whole pipeline runs
//! offline. Methods return `Result<T, String>` and leave classification to
//! the orchestrator.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::types::{
    ActionItem, CalendarEvent, CreatedTicket, RiskRecord, TicketOutcome, TrackerIssue,
};

// =============================================================================
// Traits
// =============================================================================

pub trait CalendarClient: Send + Sync {
    /// Events overlapping the window, ordered by start time.
    fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, String>;
}

/// The six risk-query shapes. All restricted to open issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerQuery {
    Overdue,
    Unassigned,
    Blocked,
    NoDueDate,
    Stale { days: i64 },
    HighPriority,
}

pub trait TrackerClient: Send + Sync {
    fn create_issue(&self, item: &ActionItem) -> Result<CreatedTicket, String>;
    fn search(&self, query: TrackerQuery) -> Result<Vec<TrackerIssue>, String>;
}

pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        summary: &str,
        tickets: &[TicketOutcome],
        risks: &[RiskRecord],
    ) -> Result<(), String>;
}

// =============================================================================
// Dev calendar
// =============================================================================

/// Fixed three-meeting calendar for offline runs.
pub struct StaticCalendar;

impl StaticCalendar {
    pub fn new() -> Self {
        Self
    }

    fn sample_events(now: DateTime<Utc>) -> Vec<CalendarEvent> {
        let meeting = |id: &str, title: &str, days_ago: i64, description: &str| CalendarEvent {
            id: id.to_string(),
            title: title.to_string(),
            start: now - Duration::days(days_ago),
            end: now - Duration::days(days_ago) + Duration::hours(1),
            description: description.to_string(),
            attendees: vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
        };
        vec![
            meeting(
                "evt-001",
                "Project Kickoff",
                3,
                "Alice: Welcome everyone. We will define the project scope today. \
                 Bob will prepare the architecture draft by Friday. \
                 Carol (QA): I will create the test plan.",
            ),
            meeting(
                "evt-002",
                "Sprint Planning",
                2,
                "Bob: The payment integration is behind schedule. \
                 Assign the migration task to Dave. \
                 Owner: Erin. Review the deployment checklist by Monday.",
            ),
            meeting(
                "evt-003",
                "Retrospective",
                1,
                "Alice: The release went well overall. \
                 There is a risk of delay on the reporting feature. \
                 Follow up: document the incident runbook.",
            ),
        ]
    }
}

impl Default for StaticCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarClient for StaticCalendar {
    fn fetch_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, String> {
        let events: Vec<CalendarEvent> = Self::sample_events(Utc::now())
            .into_iter()
            .filter(|event| event.start >= start && event.start <= end)
            .collect();
        log::debug!("StaticCalendar returned {} event(s)", events.len());
        Ok(events)
    }
}

// =============================================================================
// Dev tracker
// =============================================================================

struct StoredIssue {
    issue: TrackerIssue,
    open: bool,
    flagged: bool,
}

/// In-memory tracker honoring all six query shapes against `Utc::now()`.
pub struct InMemoryTracker {
    issues: Mutex<Vec<StoredIssue>>,
    counter: Mutex<u32>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self {
            issues: Mutex::new(Vec::new()),
            counter: Mutex::new(0),
        }
    }

    /// Seed one open issue; used by dev bootstrap and tests.
    pub fn seed(
        &self,
        title: &str,
        assignee: Option<&str>,
        due_date: Option<&str>,
        updated_at: Option<&str>,
        priority: Option<&str>,
        flagged: bool,
    ) -> String {
        let key = self.next_key();
        self.issues.lock().push(StoredIssue {
            issue: TrackerIssue {
                key: key.clone(),
                title: title.to_string(),
                assignee: assignee.map(str::to_string),
                due_date: due_date.map(str::to_string),
                updated_at: updated_at.map(str::to_string),
                priority: priority.map(str::to_string),
            },
            open: true,
            flagged,
        });
        key
    }

    fn next_key(&self) -> String {
        let mut counter = self.counter.lock();
        *counter += 1;
        format!("MF-{}", *counter)
    }
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerClient for InMemoryTracker {
    fn create_issue(&self, item: &ActionItem) -> Result<CreatedTicket, String> {
        if item.summary.trim().is_empty() {
            return Err("Issue title must not be empty".to_string());
        }
        let key = self.next_key();
        let due = item
            .due_date
            .clone()
            .unwrap_or_else(|| crate::extract::end_of_week(Utc::now()));
        self.issues.lock().push(StoredIssue {
            issue: TrackerIssue {
                key: key.clone(),
                title: item.summary.clone(),
                assignee: item.assignee.clone(),
                due_date: Some(due.clone()),
                updated_at: Some(Utc::now().format("%Y-%m-%d").to_string()),
                priority: None,
            },
            open: true,
            flagged: false,
        });
        log::info!("Created issue {} \"{}\"", key, item.summary);
        Ok(CreatedTicket {
            key,
            title: item.summary.clone(),
            assignee: item.assignee.clone(),
            due_date: Some(due),
        })
    }

    fn search(&self, query: TrackerQuery) -> Result<Vec<TrackerIssue>, String> {
        let today = Utc::now().date_naive();
        let issues = self.issues.lock();
        let matched = issues
            .iter()
            .filter(|stored| stored.open)
            .filter(|stored| match query {
                TrackerQuery::Overdue => date_before(&stored.issue.due_date, today),
                TrackerQuery::Unassigned => stored.issue.assignee.is_none(),
                TrackerQuery::Blocked => stored.flagged,
                TrackerQuery::NoDueDate => stored.issue.due_date.is_none(),
                TrackerQuery::Stale { days } => {
                    date_before(&stored.issue.updated_at, today - Duration::days(days))
                }
                TrackerQuery::HighPriority => matches!(
                    stored.issue.priority.as_deref(),
                    Some("Highest") | Some("High")
                ),
            })
            .map(|stored| stored.issue.clone())
            .collect();
        Ok(matched)
    }
}

fn date_before(date: &Option<String>, cutoff: NaiveDate) -> bool {
    date.as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(|d| d < cutoff)
        .unwrap_or(false)
}

// =============================================================================
// Dev completion client
// =============================================================================

/// Offline stand-in for a hosted model. Answers every prompt with a JSON
/// object whose bullets are the first sentences of the transcript portion,
/// which keeps the structured backend exercisable without network access.
pub struct CannedCompletion;

impl CannedCompletion {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CannedCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::summarize::structured::CompletionClient for CannedCompletion {
    fn complete(&self, prompt: &str) -> Result<String, String> {
        let transcript = prompt
            .rsplit("Transcript:\n")
            .next()
            .unwrap_or(prompt)
            .trim();
        let bullets: Vec<serde_json::Value> = transcript
            .split_inclusive(['.', '?', '!'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(3)
            .map(|s| serde_json::Value::String(s.to_string()))
            .collect();
        let body = serde_json::json!({ "summary": bullets, "action_items": [] });
        Ok(body.to_string())
    }
}

// =============================================================================
// Dev notifier
// =============================================================================

/// Log-only notifier. Every delivery gets a fresh id so runs are traceable.
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn notify(
        &self,
        summary: &str,
        tickets: &[TicketOutcome],
        risks: &[RiskRecord],
    ) -> Result<(), String> {
        let id = Uuid::new_v4();
        log::info!(
            "Notification {}: {} ticket(s), {} risk(s), summary {} char(s)",
            id,
            tickets.len(),
            risks.len(),
            summary.chars().count()
        );
        Ok(())
    }
}
