//! Batch workflow: the whole pipeline in one call.
//!
//! An alternate entry point, not a different algorithm — each node calls the
//! same stage handlers the stepwise path uses, in the fixed edge order
//! fetch → summarize → risk-detection → ticket-creation → notify, threading
//! each node's output into the next node's context the same way an external
//! caller would echo it back.

use crate::orchestrator::Orchestrator;
use crate::types::{Envelope, OrchestrateRequest, Stage, StageBody};

pub fn run_workflow(orchestrator: &Orchestrator, request: &OrchestrateRequest) -> Envelope {
    log::info!("Running batch workflow");
    let mut carried = request.clone();
    carried.stage = None;

    // fetch
    let fetched = match orchestrator.run_stage(Stage::Fetch, &carried) {
        Ok(envelope) => envelope,
        Err(error) => return workflow_error(error.to_string()),
    };
    if let StageBody::Fetch {
        calendar_events,
        calendar_transcripts,
        ..
    } = fetched.body
    {
        carried.context.calendar_events = calendar_events;
        carried.context.calendar_transcripts = calendar_transcripts;
    }

    // summarize (falls back to the raw transcripts we just fetched)
    let summarized = match orchestrator.run_stage(Stage::Summarize, &carried) {
        Ok(envelope) => envelope,
        Err(error) => return workflow_error(error.to_string()),
    };
    let mut mode = String::from("none");
    if let StageBody::Summarize {
        summaries,
        action_items,
        mode: used_mode,
        ..
    } = summarized.body
    {
        carried.context.summaries = summaries;
        carried.context.action_items = action_items;
        mode = used_mode;
    }
    log::debug!("Workflow summarization used mode '{}'", mode);

    // risk-detection
    if let Ok(envelope) = orchestrator.run_stage(Stage::RiskDetection, &carried) {
        if let StageBody::Risks { risks } = envelope.body {
            carried.context.risks = risks;
        }
    }

    // ticket-creation (skipped cleanly when nothing was extracted)
    if !carried.context.action_items.is_empty() {
        match orchestrator.run_stage(Stage::TicketCreation, &carried) {
            Ok(envelope) => {
                if let StageBody::Tickets { tickets } = envelope.body {
                    carried.context.tickets = tickets;
                }
            }
            Err(error) => log::warn!("Workflow ticket-creation failed: {}", error),
        }
    }

    // notify
    let notified = match orchestrator.run_stage(Stage::Notify, &carried) {
        Ok(envelope) => matches!(envelope.body, StageBody::Notify { notified: true }),
        Err(error) => {
            log::warn!("Workflow notification failed: {}", error);
            false
        }
    };

    Envelope {
        stage: "workflow".to_string(),
        body: StageBody::Workflow {
            calendar_events: carried.context.calendar_events,
            calendar_transcripts: carried.context.calendar_transcripts,
            summaries: carried.context.summaries,
            action_items: carried.context.action_items,
            risks: carried.context.risks,
            tickets: carried.context.tickets,
            notified,
        },
        error: None,
        next_actions: Vec::new(),
    }
}

fn workflow_error(message: String) -> Envelope {
    log::error!("Batch workflow aborted: {}", message);
    Envelope {
        stage: "workflow".to_string(),
        body: StageBody::Empty {},
        error: Some(message),
        next_actions: Vec::new(),
    }
}
