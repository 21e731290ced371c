//! Axum route handlers for the Generation API.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::consumer::{GenerationPhase, GenerationSnapshot};
use crate::generation::formatting::{render, visible_sources, Paragraph, Placeholders};
use crate::generation::models::SourceAttribution;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub run_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedResponse {
    pub phase: GenerationPhase,
    pub is_loading: bool,
    pub paragraphs: Vec<Paragraph>,
    pub sources: Option<Vec<SourceAttribution>>,
    pub error: Option<String>,
    /// This result has already been saved.
    pub saved: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generation
///
/// Validates the whole form and starts a generation. Field errors come back
/// as 422 and are also stored on the form.
pub async fn handle_submit(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let params = *state.model_params.read().await;
    let request = state
        .form
        .write()
        .await
        .build_request(params)
        .map_err(|errors| {
            debug!("Generation blocked by {} field error(s)", errors.len());
            AppError::InvalidForm(errors)
        })?;

    let run_id = state.consumer.submit(request).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { run_id })))
}

/// POST /api/v1/generation/stop
pub async fn handle_stop(State(state): State<AppState>) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: state.consumer.stop().await,
    })
}

/// GET /api/v1/generation
pub async fn handle_snapshot(State(state): State<AppState>) -> Json<GenerationSnapshot> {
    Json(state.consumer.snapshot())
}

/// GET /api/v1/generation/events
///
/// Server-sent events: the current snapshot first, then one event per
/// transition. Intermediate snapshots may be skipped by slow readers.
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.consumer.subscribe()).filter_map(|snapshot| async move {
        match Event::default().event("generation").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                debug!("Dropping unserializable generation event: {e}");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/v1/generation/rendered
///
/// The current result formatted for display: placeholders filled from the
/// form, split into paragraphs with bold spans, unknown sources hidden.
pub async fn handle_rendered(State(state): State<AppState>) -> Json<RenderedResponse> {
    let snapshot = state.consumer.snapshot();
    let text = snapshot
        .result
        .as_ref()
        .map(|r| r.text.as_str())
        .unwrap_or_default();

    let paragraphs = {
        let form = state.form.read().await;
        let input = form.input();
        let placeholders = Placeholders {
            company: &input.company,
            position: input.job_role.map(|role| role.title()).unwrap_or_default(),
            department: &input.department,
        };
        if text.is_empty() {
            Vec::new()
        } else {
            render(text, &placeholders)
        }
    };

    let sources = visible_sources(
        snapshot
            .result
            .as_ref()
            .and_then(|r| r.sources.as_deref()),
    )
    .map(<[_]>::to_vec);

    Json(RenderedResponse {
        phase: snapshot.phase,
        is_loading: snapshot.is_loading,
        paragraphs,
        sources,
        error: snapshot.error,
        saved: snapshot.run_id.is_some_and(|id| state.saver.is_saved(id)),
    })
}
