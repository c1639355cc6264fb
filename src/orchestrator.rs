//! The stage state machine.
//!
//! One entry point, [`Orchestrator::handle_query`], dispatches a request to
//! exactly one stage handler and always comes back with a well-formed
//! [`Envelope`]. This is the error boundary: collaborator failures, missing
//! inputs, and unknown stage names all land in the envelope's `error` field
//! and are never raised to the caller.
//!
//! The orchestrator holds no session state. Whatever a later stage needs
//! from an earlier one arrives in the request's `context`, echoed back by
//! the caller.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::clients::{
    CalendarClient, CannedCompletion, InMemoryTracker, LogNotifier, Notifier, StaticCalendar,
    TrackerClient,
};
use crate::config::PipelineConfig;
use crate::error::{FlowError, FlowResult};
use crate::intent::{IntentClassifier, KeywordIntentClassifier};
use crate::preprocess;
use crate::risk;
use crate::summarize::structured::StructuredBackend;
use crate::summarize::{
    self, BackendRegistry, SummarizeOptions, MODE_EXTRACTIVE, MODE_STRUCTURED,
};
use crate::types::{
    transcript_from_event, ActionItem, CalendarEvent, Envelope, OrchestrateRequest, Stage,
    StageBody, SummaryText, TicketOutcome, TicketStatus,
};

/// Fetch window: events this far back are still "recent meetings".
const FETCH_LOOKBACK_DAYS: i64 = 37;
/// Fetch window extends slightly forward to catch in-progress meetings.
const FETCH_LOOKAHEAD_DAYS: i64 = 1;

pub const NO_TRANSCRIPTS_MSG: &str =
    "No transcripts available to summarize. Please fetch and preprocess events first.";
pub const NO_ACTION_ITEMS_MSG: &str =
    "No action items available for ticket creation. Please summarize first.";
pub const NO_PREPROCESS_INPUT_MSG: &str =
    "No calendar transcripts available to preprocess. Please fetch events first.";

/// Field-request keywords for the fetch/summarize shortcut, checked in
/// order; first hit wins.
const FIELD_TABLE: &[(&str, &str)] = &[
    ("decision", "decisions"),
    ("action item", "action_items"),
    ("risk", "risks"),
    ("concern", "concerns"),
    ("follow up", "follow_up_questions"),
    ("follow-up", "follow_up_questions"),
    ("question", "follow_up_questions"),
    ("summary", "summaries"),
];

pub struct Orchestrator {
    config: PipelineConfig,
    calendar: Box<dyn CalendarClient>,
    tracker: Box<dyn TrackerClient>,
    notifier: Box<dyn Notifier>,
    registry: BackendRegistry,
    classifier: Box<dyn IntentClassifier>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        calendar: Box<dyn CalendarClient>,
        tracker: Box<dyn TrackerClient>,
        notifier: Box<dyn Notifier>,
        registry: BackendRegistry,
    ) -> Self {
        Self {
            config,
            calendar,
            tracker,
            notifier,
            registry,
            classifier: Box::new(KeywordIntentClassifier::new()),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Fully offline orchestrator: static calendar, in-memory tracker,
    /// log notifier, extractive backend (plus structured when enabled).
    pub fn dev(config: PipelineConfig) -> Self {
        let mut registry = BackendRegistry::new().register(MODE_EXTRACTIVE, || {
            Ok(Arc::new(summarize::extractive::ExtractiveBackend::new())
                as Arc<dyn summarize::SummaryBackend>)
        });
        if config.structured_enabled {
            registry = registry.register(MODE_STRUCTURED, || {
                Ok(Arc::new(StructuredBackend::new(Box::new(CannedCompletion::new())))
                    as Arc<dyn summarize::SummaryBackend>)
            });
        }
        Self::new(
            config,
            Box::new(StaticCalendar::new()),
            Box::new(InMemoryTracker::new()),
            Box::new(LogNotifier::new()),
            registry,
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Release lazily-loaded backend handles.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Route one request to its stage and return the stage's envelope.
    pub fn handle_query(&self, request: &OrchestrateRequest) -> Envelope {
        if self.config.batch_workflow {
            return crate::workflow::run_workflow(self, request);
        }

        let stage = match self.resolve_stage(request) {
            Ok(stage) => stage,
            Err(FlowError::UnknownStage(name)) => {
                log::warn!("Unknown stage requested: {}", name);
                return Envelope::unknown_stage(&name);
            }
            Err(error) => return Envelope::stage_error(Stage::Fetch, error.to_string()),
        };

        log::info!("Dispatching stage '{}'", stage);
        let envelope = match self.run_stage(stage, request) {
            Ok(envelope) => envelope,
            Err(error) => {
                log::error!("Stage '{}' failed: {}", stage, error);
                Envelope::stage_error(stage, error.to_string())
            }
        };

        self.apply_field_shortcut(stage, request, envelope)
    }

    /// Run one stage against caller-supplied context, skipping intent
    /// inference and the field shortcut. The workflow path uses this.
    pub(crate) fn run_stage(
        &self,
        stage: Stage,
        request: &OrchestrateRequest,
    ) -> FlowResult<Envelope> {
        match stage {
            Stage::Fetch => self.stage_fetch(),
            Stage::Preprocess => self.stage_preprocess(request),
            Stage::Summarize => self.stage_summarize(request),
            Stage::TicketCreation => self.stage_tickets(request),
            Stage::RiskDetection => self.stage_risks(request),
            Stage::Notify => self.stage_notify(request),
        }
    }

    fn resolve_stage(&self, request: &OrchestrateRequest) -> FlowResult<Stage> {
        if let Some(name) = request.stage.as_deref() {
            return name
                .parse()
                .map_err(|_| FlowError::UnknownStage(name.to_string()));
        }
        let query = request.query.as_deref().unwrap_or("");
        Ok(self.classifier.classify(query))
    }

    // =========================================================================
    // Stage handlers
    // =========================================================================

    fn stage_fetch(&self) -> FlowResult<Envelope> {
        let now = Utc::now();
        let events = self
            .calendar
            .fetch_events(
                now - Duration::days(FETCH_LOOKBACK_DAYS),
                now + Duration::days(FETCH_LOOKAHEAD_DAYS),
            )
            .map_err(|e| FlowError::collaborator("Calendar", e))?;
        let transcripts: Vec<String> = events.iter().map(transcript_from_event).collect();
        log::info!("Fetched {} event(s)", events.len());
        Ok(Envelope::new(
            Stage::Fetch,
            StageBody::Fetch {
                event_count: events.len(),
                transcript_count: transcripts.len(),
                calendar_events: events,
                calendar_transcripts: transcripts,
            },
        ))
    }

    fn stage_preprocess(&self, request: &OrchestrateRequest) -> FlowResult<Envelope> {
        // Nothing carried forward: re-fetch rather than give up, so
        // preprocess stays independently callable.
        let mut events = request.context.calendar_events.clone();
        let mut transcripts = request.context.calendar_transcripts.clone();
        if events.is_empty() && transcripts.is_empty() {
            log::info!("Preprocess has no carried events; re-fetching");
            let now = Utc::now();
            match self.calendar.fetch_events(
                now - Duration::days(FETCH_LOOKBACK_DAYS),
                now + Duration::days(FETCH_LOOKAHEAD_DAYS),
            ) {
                Ok(fetched) => {
                    transcripts = fetched.iter().map(transcript_from_event).collect();
                    events = fetched;
                }
                Err(error) => {
                    return Ok(Envelope::new(
                        Stage::Preprocess,
                        StageBody::Preprocess {
                            selected_events: Vec::new(),
                            processed_transcripts: Vec::new(),
                            processed_transcript_count: 0,
                            preprocessing_error: Some(
                                FlowError::collaborator("Calendar", error).to_string(),
                            ),
                        },
                    ));
                }
            }
        }

        let selected = select_events(&events, request.selected_event_indices.as_deref());
        let raw: Vec<String> = if !transcripts.is_empty() {
            select_transcripts(&transcripts, request.selected_event_indices.as_deref())
        } else {
            selected.iter().map(transcript_from_event).collect()
        };

        if raw.iter().all(|t| t.trim().is_empty()) {
            // Reported in-band: the stage "succeeds" with an empty result
            // plus a preprocessing_error the caller can surface.
            return Ok(Envelope::new(
                Stage::Preprocess,
                StageBody::Preprocess {
                    selected_events: selected,
                    processed_transcripts: Vec::new(),
                    processed_transcript_count: 0,
                    preprocessing_error: Some(NO_PREPROCESS_INPUT_MSG.to_string()),
                },
            ));
        }

        let processed = preprocess::chunk_transcripts(&raw, self.config.chunk_words, true);
        Ok(Envelope::new(
            Stage::Preprocess,
            StageBody::Preprocess {
                selected_events: selected,
                processed_transcript_count: processed.len(),
                processed_transcripts: processed,
                preprocessing_error: None,
            },
        ))
    }

    fn stage_summarize(&self, request: &OrchestrateRequest) -> FlowResult<Envelope> {
        let transcripts = self.summarize_inputs(request)?;
        let options = SummarizeOptions {
            mode: request.mode.clone(),
        };

        let mut summaries: Vec<SummaryText> = Vec::new();
        let mut action_items: Vec<ActionItem> = Vec::new();
        let mut mode = "none".to_string();
        for transcript in &transcripts {
            let result = summarize::summarize(&self.registry, &[transcript.clone()], &options);
            if mode == "none" && result.mode != "none" {
                mode = result.mode.clone();
            }
            summaries.push(result.summary);
            action_items.extend(result.action_items);
        }

        Ok(Envelope::new(
            Stage::Summarize,
            StageBody::Summarize {
                summary_count: summaries.len(),
                summaries,
                action_items,
                mode,
            },
        ))
    }

    /// Same-stage fallback chain for summarize inputs: request override,
    /// carried processed chunks, carried raw transcripts, fresh fetch.
    fn summarize_inputs(&self, request: &OrchestrateRequest) -> FlowResult<Vec<String>> {
        if let Some(given) = &request.processed_transcripts {
            if !given.is_empty() {
                return Ok(given.clone());
            }
        }
        if !request.context.processed_transcripts.is_empty() {
            return Ok(request.context.processed_transcripts.clone());
        }
        if !request.context.calendar_transcripts.is_empty() {
            log::info!("Summarize falling back to raw calendar transcripts");
            return Ok(request.context.calendar_transcripts.clone());
        }
        log::info!("Summarize falling back to a fresh calendar fetch");
        let now = Utc::now();
        let events = self
            .calendar
            .fetch_events(
                now - Duration::days(FETCH_LOOKBACK_DAYS),
                now + Duration::days(FETCH_LOOKAHEAD_DAYS),
            )
            .map_err(|e| FlowError::collaborator("Calendar", e))?;
        let transcripts: Vec<String> = events
            .iter()
            .map(transcript_from_event)
            .filter(|t| !t.trim().is_empty())
            .collect();
        if transcripts.is_empty() {
            return Err(FlowError::InputMissing(NO_TRANSCRIPTS_MSG.to_string()));
        }
        Ok(transcripts)
    }

    fn stage_tickets(&self, request: &OrchestrateRequest) -> FlowResult<Envelope> {
        let items = request
            .selected_action_items
            .as_deref()
            .filter(|items| !items.is_empty())
            .unwrap_or(request.context.action_items.as_slice());
        if items.is_empty() {
            return Err(FlowError::InputMissing(NO_ACTION_ITEMS_MSG.to_string()));
        }

        let tickets: Vec<TicketOutcome> = items
            .iter()
            .map(|item| match self.tracker.create_issue(item) {
                Ok(created) => TicketOutcome {
                    title: created.title,
                    status: TicketStatus::Created,
                    key: Some(created.key),
                    error: None,
                },
                Err(error) => {
                    log::warn!("Ticket creation failed for \"{}\": {}", item.summary, error);
                    TicketOutcome {
                        title: item.summary.clone(),
                        status: TicketStatus::Failed,
                        key: None,
                        error: Some(error),
                    }
                }
            })
            .collect();

        let created = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Created)
            .count();
        log::info!("Created {}/{} ticket(s)", created, tickets.len());
        Ok(Envelope::new(
            Stage::TicketCreation,
            StageBody::Tickets { tickets },
        ))
    }

    fn stage_risks(&self, request: &OrchestrateRequest) -> FlowResult<Envelope> {
        let summary_text = request
            .context
            .summaries
            .iter()
            .map(SummaryText::joined)
            .collect::<Vec<_>>()
            .join("\n");
        let risks = risk::detect_risks(
            self.tracker.as_ref(),
            &summary_text,
            self.config.stale_days,
            true,
        );
        Ok(Envelope::new(Stage::RiskDetection, StageBody::Risks { risks }))
    }

    fn stage_notify(&self, request: &OrchestrateRequest) -> FlowResult<Envelope> {
        let summary_text = request
            .context
            .summaries
            .iter()
            .map(SummaryText::joined)
            .collect::<Vec<_>>()
            .join("\n");
        match self.notifier.notify(
            &summary_text,
            &request.context.tickets,
            &request.context.risks,
        ) {
            Ok(()) => Ok(Envelope::new(Stage::Notify, StageBody::Notify { notified: true })),
            Err(error) => Ok(Envelope::new(
                Stage::Notify,
                StageBody::Notify { notified: false },
            )
            .with_error(FlowError::collaborator("Notifier", error).to_string())),
        }
    }

    // =========================================================================
    // Field shortcut
    // =========================================================================

    /// On fetch/summarize, a field-request keyword in the query collapses
    /// the envelope to that single field. A filter over the computed result,
    /// not a separate stage.
    fn apply_field_shortcut(
        &self,
        stage: Stage,
        request: &OrchestrateRequest,
        envelope: Envelope,
    ) -> Envelope {
        if !self.config.field_shortcut
            || !matches!(stage, Stage::Fetch | Stage::Summarize)
            || envelope.error.is_some()
        {
            return envelope;
        }
        let query = match request.query.as_deref() {
            Some(query) if !query.is_empty() => query.to_lowercase(),
            _ => return envelope,
        };
        let field = match FIELD_TABLE
            .iter()
            .find(|(keyword, _)| query.contains(keyword))
        {
            Some((_, field)) => *field,
            None => return envelope,
        };

        log::info!("Field shortcut: returning only '{}'", field);
        let body_json = match serde_json::to_value(&envelope.body) {
            Ok(value) => value,
            Err(_) => return envelope,
        };
        let value = body_json
            .get(field)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        let mut map = serde_json::Map::new();
        map.insert(field.to_string(), value);
        Envelope {
            stage: envelope.stage,
            body: StageBody::Field(map),
            error: None,
            next_actions: envelope.next_actions,
        }
    }
}

/// Index selection over carried events; out-of-range indices are dropped.
fn select_events(events: &[CalendarEvent], indices: Option<&[usize]>) -> Vec<CalendarEvent> {
    match indices {
        Some(indices) => indices
            .iter()
            .filter_map(|&i| events.get(i).cloned())
            .collect(),
        None => events.to_vec(),
    }
}

fn select_transcripts(transcripts: &[String], indices: Option<&[usize]>) -> Vec<String> {
    match indices {
        Some(indices) => indices
            .iter()
            .filter_map(|&i| transcripts.get(i).cloned())
            .collect(),
        None => transcripts.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CreatedTicket, TrackerIssue};
    use serde_json::Value;

    fn dev_orchestrator() -> Orchestrator {
        Orchestrator::dev(PipelineConfig::default())
    }

    fn to_json(envelope: &Envelope) -> Value {
        serde_json::to_value(envelope).unwrap()
    }

    #[test]
    fn test_fetch_returns_events_and_transcripts() {
        let orchestrator = dev_orchestrator();
        let request = OrchestrateRequest {
            stage: Some("fetch".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "fetch");
        assert_eq!(json["event_count"], 3);
        assert_eq!(json["transcript_count"], 3);
        assert_eq!(json["next_actions"], serde_json::json!(["preprocess"]));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_unknown_stage_is_reported_not_raised() {
        let orchestrator = dev_orchestrator();
        let request = OrchestrateRequest {
            stage: Some("bogus".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "bogus");
        assert_eq!(json["error"], "Unknown stage: bogus");
    }

    #[test]
    fn test_intent_inference_without_explicit_stage() {
        let orchestrator = dev_orchestrator();
        let request = OrchestrateRequest {
            query: Some("what's on the calendar lately".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "fetch");
    }

    #[test]
    fn test_preprocess_consumes_carried_transcripts() {
        let orchestrator = dev_orchestrator();
        let mut request = OrchestrateRequest {
            stage: Some("preprocess".to_string()),
            ..Default::default()
        };
        request.context.calendar_transcripts = vec![
            "[00:01] Alice: Um, we will ship the release on Friday.".to_string(),
            "Bob: Review the deployment checklist.".to_string(),
        ];
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "preprocess");
        assert_eq!(json["processed_transcript_count"], 2);
        let first = json["processed_transcripts"][0].as_str().unwrap();
        assert!(!first.contains("um"));
        assert!(first.contains("we will ship the release on friday."));
    }

    #[test]
    fn test_preprocess_refetches_when_nothing_carried() {
        let orchestrator = dev_orchestrator();
        let request = OrchestrateRequest {
            stage: Some("preprocess".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "preprocess");
        // Dev calendar has three meetings; the re-fetch path picks them up
        assert_eq!(json["processed_transcript_count"], 3);
        assert!(json.get("preprocessing_error").is_none());
    }

    #[test]
    fn test_preprocess_without_inputs_anywhere_reports_in_band() {
        let orchestrator = orchestrator_with_empty_calendar();
        let request = OrchestrateRequest {
            stage: Some("preprocess".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "preprocess");
        assert_eq!(json["processed_transcript_count"], 0);
        assert_eq!(json["preprocessing_error"], NO_PREPROCESS_INPUT_MSG);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_summarize_uses_carried_processed_transcripts() {
        let orchestrator = dev_orchestrator();
        let mut request = OrchestrateRequest {
            stage: Some("summarize".to_string()),
            ..Default::default()
        };
        request.context.processed_transcripts = vec![
            "the team agreed on the rollout plan. bob will prepare the checklist by friday."
                .to_string(),
        ];
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "summarize");
        assert_eq!(json["summary_count"], 1);
        assert_eq!(json["mode"], "extractive");
        assert!(!json["action_items"].as_array().unwrap().is_empty());
        assert_eq!(
            json["next_actions"],
            serde_json::json!(["ticket-creation", "risk-detection"])
        );
    }

    #[test]
    fn test_summarize_falls_back_to_fresh_fetch() {
        let orchestrator = dev_orchestrator();
        let request = OrchestrateRequest {
            stage: Some("summarize".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        // StaticCalendar has three meetings; the fresh-fetch fallback
        // summarizes them without any carried context
        assert_eq!(json["summary_count"], 3);
        assert!(json.get("error").is_none());
    }

    /// Calendar that never has anything.
    struct EmptyCalendar;
    impl CalendarClient for EmptyCalendar {
        fn fetch_events(
            &self,
            _start: chrono::DateTime<Utc>,
            _end: chrono::DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, String> {
            Ok(Vec::new())
        }
    }

    fn orchestrator_with_empty_calendar() -> Orchestrator {
        Orchestrator::new(
            PipelineConfig::default(),
            Box::new(EmptyCalendar),
            Box::new(InMemoryTracker::new()),
            Box::new(LogNotifier::new()),
            BackendRegistry::new().register(MODE_EXTRACTIVE, || {
                Ok(Arc::new(summarize::extractive::ExtractiveBackend::new())
                    as Arc<dyn summarize::SummaryBackend>)
            }),
        )
    }

    #[test]
    fn test_summarize_with_nothing_anywhere_names_whats_missing() {
        let orchestrator = orchestrator_with_empty_calendar();
        let request = OrchestrateRequest {
            stage: Some("summarize".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "summarize");
        assert_eq!(json["error"], NO_TRANSCRIPTS_MSG);
    }

    #[test]
    fn test_ticket_creation_records_partial_failures() {
        /// Fails any title containing "reject".
        struct PickyTracker;
        impl TrackerClient for PickyTracker {
            fn create_issue(&self, item: &ActionItem) -> Result<CreatedTicket, String> {
                if item.summary.contains("reject") {
                    Err("validation failed".to_string())
                } else {
                    Ok(CreatedTicket {
                        key: format!("MF-{}", item.summary.len()),
                        title: item.summary.clone(),
                        assignee: item.assignee.clone(),
                        due_date: item.due_date.clone(),
                    })
                }
            }
            fn search(
                &self,
                _query: crate::clients::TrackerQuery,
            ) -> Result<Vec<TrackerIssue>, String> {
                Ok(Vec::new())
            }
        }

        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            Box::new(EmptyCalendar),
            Box::new(PickyTracker),
            Box::new(LogNotifier::new()),
            BackendRegistry::new(),
        );
        let mut request = OrchestrateRequest {
            stage: Some("ticket-creation".to_string()),
            ..Default::default()
        };
        request.context.action_items = vec![
            ActionItem::new("Ship the release"),
            ActionItem::new("rejectable middle item"),
            ActionItem::new("Write the changelog"),
        ];
        let json = to_json(&orchestrator.handle_query(&request));
        let tickets = json["tickets"].as_array().unwrap();
        assert_eq!(tickets.len(), 3);
        assert_eq!(tickets[0]["status"], "created");
        assert_eq!(tickets[1]["status"], "failed");
        assert_eq!(tickets[1]["error"], "validation failed");
        assert_eq!(tickets[2]["status"], "created");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_ticket_creation_without_items_errors() {
        let orchestrator = dev_orchestrator();
        let request = OrchestrateRequest {
            stage: Some("ticket-creation".to_string()),
            ..Default::default()
        };
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["error"], NO_ACTION_ITEMS_MSG);
    }

    #[test]
    fn test_risk_detection_combines_sources() {
        let orchestrator = dev_orchestrator();
        let mut request = OrchestrateRequest {
            stage: Some("risk-detection".to_string()),
            ..Default::default()
        };
        request.context.summaries =
            vec![SummaryText::Text("The rollout is behind schedule.".to_string())];
        let json = to_json(&orchestrator.handle_query(&request));
        let risks = json["risks"].as_array().unwrap();
        // Dev tracker is empty; only the text signal fires
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0]["type"], "text_signal");
        assert_eq!(json["next_actions"], serde_json::json!(["notify"]));
    }

    #[test]
    fn test_notify_reports_delivery() {
        let orchestrator = dev_orchestrator();
        let mut request = OrchestrateRequest {
            stage: Some("notify".to_string()),
            ..Default::default()
        };
        request.context.summaries = vec![SummaryText::Text("Done.".to_string())];
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["notified"], true);
        assert!(json.get("next_actions").is_none());
    }

    #[test]
    fn test_field_shortcut_on_summarize() {
        let orchestrator = dev_orchestrator();
        let mut request = OrchestrateRequest {
            query: Some("summarize and give me the action items".to_string()),
            ..Default::default()
        };
        request.context.processed_transcripts =
            vec!["bob will prepare the quarterly report by friday for the board".to_string()];
        let json = to_json(&orchestrator.handle_query(&request));
        assert_eq!(json["stage"], "summarize");
        let object = json.as_object().unwrap();
        assert!(object.contains_key("action_items"));
        assert!(!object.contains_key("summaries"));
        assert_eq!(json["action_items"][0]["summary"].as_str().unwrap().to_lowercase(),
            "bob will prepare the quarterly report by friday for the board");
    }

    #[test]
    fn test_field_shortcut_respects_config_flag() {
        let config = PipelineConfig {
            field_shortcut: false,
            ..Default::default()
        };
        let orchestrator = Orchestrator::dev(config);
        let mut request = OrchestrateRequest {
            query: Some("summarize and give me the action items".to_string()),
            ..Default::default()
        };
        request.context.processed_transcripts =
            vec!["bob will prepare the quarterly report by friday for the board".to_string()];
        let json = to_json(&orchestrator.handle_query(&request));
        // Full envelope survives when the shortcut is off
        assert!(json.as_object().unwrap().contains_key("summaries"));
    }

    #[test]
    fn test_selected_event_indices_filter_preprocess() {
        let orchestrator = dev_orchestrator();
        let mut request = OrchestrateRequest {
            stage: Some("preprocess".to_string()),
            selected_event_indices: Some(vec![1, 99]),
            ..Default::default()
        };
        request.context.calendar_transcripts = vec![
            "First meeting transcript, quite boring.".to_string(),
            "Second meeting: Dave will fix the build.".to_string(),
        ];
        let json = to_json(&orchestrator.handle_query(&request));
        // Index 99 is silently dropped
        assert_eq!(json["processed_transcript_count"], 1);
        assert!(json["processed_transcripts"][0]
            .as_str()
            .unwrap()
            .contains("fix the build"));
    }
}
