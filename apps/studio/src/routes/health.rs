use axum::{extract::State, Json};
use serde::Serialize;

use crate::generation::consumer::GenerationPhase;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub generation: GenerationPhase,
    pub saving: bool,
}

/// GET /health
/// Liveness plus what the controllers are doing right now.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        generation: state.consumer.snapshot().phase,
        saving: state.saver.snapshot().saving,
    })
}
