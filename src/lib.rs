//! meetingflow — meeting-data pipeline orchestration.
//!
//! Turns raw calendar meetings into summaries, tracker tickets, risk
//! reports, and notifications through a six-stage pipeline (fetch,
//! preprocess, summarize, ticket-creation, risk-detection, notify). The
//! orchestrator is stateless across calls; callers echo prior stage outputs
//! back in each request's context.

pub mod clients;
pub mod config;
pub mod error;
pub mod extract;
pub mod intent;
pub mod orchestrator;
pub mod preprocess;
pub mod risk;
pub mod routing;
pub mod server;
pub mod summarize;
pub mod types;
pub mod workflow;

pub use config::PipelineConfig;
pub use error::{FlowError, FlowResult};
pub use orchestrator::Orchestrator;
pub use types::{Envelope, OrchestrateRequest, Stage};
