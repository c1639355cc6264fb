//! HTTP surface.
//!
//! Thin axum layer over the orchestrator. Business-logic failures never
//! become HTTP errors — they ride inside a 200 envelope. The only non-200
//! responses are the auth gate (401) and malformed JSON (axum's own 4xx).
//! Summarization-bearing handlers offload onto blocking workers so a
//! minutes-long backend call doesn't pin the async runtime.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::orchestrator::Orchestrator;
use crate::routing;
use crate::types::{OrchestrateRequest, Stage};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn build_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/orchestrate", post(orchestrate))
        .route("/calendar", post(calendar))
        .route("/transcript", post(transcript))
        .route("/summarize", post(summarize))
        .with_state(AppState { orchestrator })
}

pub async fn serve(orchestrator: Arc<Orchestrator>) -> Result<(), std::io::Error> {
    let addr = orchestrator.config().listen_addr.clone();
    let app = build_router(orchestrator);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await
}

/// Shared-secret gate. With no key configured every request passes; this is
/// the documented dev-mode behavior, not a security feature.
fn verify_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let expected = match &state.orchestrator.config().api_key {
        Some(expected) => expected,
        None => return Ok(()),
    };
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if presented == Some(expected.as_str()) {
        Ok(())
    } else {
        log::warn!("Rejected request with missing or invalid API key");
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid or missing API key"})),
        )
            .into_response())
    }
}

/// Run a blocking orchestrator call off the async runtime.
async fn dispatch(state: &AppState, request: OrchestrateRequest) -> Response {
    let orchestrator = Arc::clone(&state.orchestrator);
    match tokio::task::spawn_blocking(move || orchestrator.handle_query(&request)).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(join_error) => {
            log::error!("Handler worker panicked: {}", join_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal worker failure"})),
            )
                .into_response()
        }
    }
}

async fn orchestrate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OrchestrateRequest>,
) -> Response {
    if let Err(rejection) = verify_api_key(&state, &headers) {
        return rejection;
    }

    // A query naming several agents fans out to all of them.
    if request.stage.is_none() {
        let stages = routing::named_stages(request.query.as_deref().unwrap_or(""));
        if stages.len() > 1 {
            let envelopes =
                routing::route_to_agents(Arc::clone(&state.orchestrator), request, stages).await;
            return Json(envelopes).into_response();
        }
    }

    dispatch(&state, request).await
}

async fn calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<OrchestrateRequest>,
) -> Response {
    if let Err(rejection) = verify_api_key(&state, &headers) {
        return rejection;
    }
    request.stage = Some(Stage::Fetch.as_str().to_string());
    dispatch(&state, request).await
}

async fn transcript(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<OrchestrateRequest>,
) -> Response {
    if let Err(rejection) = verify_api_key(&state, &headers) {
        return rejection;
    }
    request.stage = Some(Stage::Preprocess.as_str().to_string());
    dispatch(&state, request).await
}

async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<OrchestrateRequest>,
) -> Response {
    if let Err(rejection) = verify_api_key(&state, &headers) {
        return rejection;
    }
    request.stage = Some(Stage::Summarize.as_str().to_string());
    dispatch(&state, request).await
}
