use std::sync::Arc;

use meetingflow::{Orchestrator, PipelineConfig};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from_env();
    let orchestrator = Arc::new(Orchestrator::dev(config));

    let handle = Arc::clone(&orchestrator);
    if let Err(error) = meetingflow::server::serve(handle).await {
        log::error!("Server exited with error: {}", error);
    }
    orchestrator.shutdown();
}
