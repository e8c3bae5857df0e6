//! Health check endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::ApiState;
use crate::config::AudioTransport;
use crate::pipeline::ProviderNames;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness response listing the configured collaborators
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub providers: ProviderNames,
    pub audio_transport: &'static str,
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - which providers will serve requests?
async fn ready(State(state): State<Arc<ApiState>>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ok",
        providers: state.pipeline.provider_names(),
        audio_transport: match state.audio_transport {
            AudioTransport::Inline => "inline",
            AudioTransport::Reference => "reference",
        },
    })
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
}
