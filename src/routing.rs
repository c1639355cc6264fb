//! Bounded fan-out for multi-agent queries.
//!
//! When one query names several pipeline agents, the probes run as
//! independent tasks under a semaphore: no ordering guarantee while running,
//! per-task error capture, and no cancellation once started — a failing or
//! panicking probe never takes its siblings down. Results come back in
//! submission order regardless of completion order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::intent::{IntentClassifier, KeywordIntentClassifier};
use crate::orchestrator::Orchestrator;
use crate::types::{Envelope, OrchestrateRequest, Stage};

/// Concurrent probe ceiling.
pub const MAX_CONCURRENT_PROBES: usize = 4;

/// Run independent blocking jobs under a concurrency limit. Each job's
/// failure (or panic) is captured in its own slot.
pub async fn fan_out<T, F>(jobs: Vec<F>, limit: usize) -> Vec<Result<T, String>>
where
    F: FnOnce() -> Result<T, String> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();
    let total = jobs.len();

    for (index, job) in jobs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // Semaphore closes only on drop, after all tasks finish.
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = match tokio::task::spawn_blocking(job).await {
                Ok(result) => result,
                Err(join_error) => Err(format!("worker panicked: {}", join_error)),
            };
            (index, outcome)
        });
    }

    let mut results: Vec<Result<T, String>> = Vec::with_capacity(total);
    for _ in 0..total {
        results.push(Err("worker did not report".to_string()));
    }
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => results[index] = outcome,
            Err(join_error) => log::error!("Probe task lost: {}", join_error),
        }
    }
    results
}

/// Distinct stages a free-text query names, in keyword-priority order.
/// Fewer than two means the normal single-stage path applies.
pub fn named_stages(query: &str) -> Vec<Stage> {
    let classifier = KeywordIntentClassifier::new();
    let lower = query.to_lowercase();
    let mut stages = Vec::new();
    for fragment in lower.split_whitespace() {
        let stage = classifier.classify(fragment);
        if stage != Stage::Fetch && !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    stages
}

/// Probe each named stage with a copy of the request. Every probe gets its
/// own envelope; a probe failure is itself an error envelope, so the output
/// length always equals the input length.
pub async fn route_to_agents(
    orchestrator: Arc<Orchestrator>,
    request: OrchestrateRequest,
    stages: Vec<Stage>,
) -> Vec<Envelope> {
    let jobs: Vec<_> = stages
        .iter()
        .map(|&stage| {
            let orchestrator = Arc::clone(&orchestrator);
            let mut probe = request.clone();
            probe.stage = Some(stage.as_str().to_string());
            move || Ok::<Envelope, String>(orchestrator.handle_query(&probe))
        })
        .collect();

    fan_out(jobs, MAX_CONCURRENT_PROBES)
        .await
        .into_iter()
        .zip(stages)
        .map(|(outcome, stage)| match outcome {
            Ok(envelope) => envelope,
            Err(error) => Envelope::stage_error(stage, error),
        })
        .collect()
}
