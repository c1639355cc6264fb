//! Risk detection: summary-text triggers plus the tracker query battery.
//!
//! Two independent sources. Text triggers are cheap keyword scans over the
//! meeting summary; tracker risks come from six fixed queries against open
//! issues. Each tracker query is fault-isolated: a failing query logs and
//! contributes nothing, and its siblings still run. The two sources are
//! concatenated without cross-source deduplication so callers can see the
//! same underlying problem surfaced by both.

use crate::clients::{TrackerClient, TrackerQuery};
use crate::types::{RiskKind, RiskRecord};

/// Fixed summary-text trigger phrases, matched case-insensitively.
const TEXT_TRIGGERS: &[&str] = &["behind schedule", "delay", "risk", "blocked"];

/// Default stale-issue threshold, in days.
pub const DEFAULT_STALE_DAYS: i64 = 7;

/// One low-confidence record per trigger phrase found in the summary text.
pub fn detect_text_risks(summary: &str) -> Vec<RiskRecord> {
    let lower = summary.to_lowercase();
    TEXT_TRIGGERS
        .iter()
        .filter(|trigger| lower.contains(*trigger))
        .map(|trigger| RiskRecord {
            kind: RiskKind::TextSignal,
            key: None,
            description: format!("Summary mentions \"{}\".", trigger),
            summary: None,
            severity: Some("low".to_string()),
            due_date: None,
            last_updated: None,
        })
        .collect()
}

/// Run the six-query battery against the tracker.
pub fn detect_tracker_risks(tracker: &dyn TrackerClient, stale_days: i64) -> Vec<RiskRecord> {
    let battery: [(TrackerQuery, RiskKind, String); 6] = [
        (
            TrackerQuery::Overdue,
            RiskKind::Overdue,
            "Task is overdue.".to_string(),
        ),
        (
            TrackerQuery::Unassigned,
            RiskKind::Unassigned,
            "Task is unassigned.".to_string(),
        ),
        (
            TrackerQuery::Blocked,
            RiskKind::Blocked,
            "Task is blocked or flagged.".to_string(),
        ),
        (
            TrackerQuery::NoDueDate,
            RiskKind::NoDueDate,
            "Task has no due date.".to_string(),
        ),
        (
            TrackerQuery::Stale { days: stale_days },
            RiskKind::Stale,
            format!("Task not updated in {}+ days.", stale_days),
        ),
        (
            TrackerQuery::HighPriority,
            RiskKind::HighPriority,
            "High priority task unresolved.".to_string(),
        ),
    ];

    let mut risks = Vec::new();
    for (query, kind, description) in battery {
        match tracker.search(query) {
            Ok(issues) => {
                for issue in issues {
                    risks.push(RiskRecord {
                        kind,
                        key: Some(issue.key),
                        description: description.clone(),
                        summary: Some(issue.title),
                        severity: issue.priority,
                        due_date: issue.due_date,
                        last_updated: issue.updated_at,
                    });
                }
            }
            Err(error) => {
                log::warn!("Risk query {:?} failed: {}", query, error);
            }
        }
    }
    risks
}

/// Full detection pass: tracker battery first (when enabled), then text
/// signals, appended in that order.
pub fn detect_risks(
    tracker: &dyn TrackerClient,
    summary_text: &str,
    stale_days: i64,
    tracker_queries_enabled: bool,
) -> Vec<RiskRecord> {
    let mut risks = if tracker_queries_enabled {
        detect_tracker_risks(tracker, stale_days)
    } else {
        Vec::new()
    };
    risks.extend(detect_text_risks(summary_text));
    log::info!("Risk detection produced {} record(s)", risks.len());
    risks
}
