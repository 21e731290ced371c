//! Axum route handlers for saving cover letters.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::save::controller::{DismissOutcome, SaveOutcome, SaveSnapshot, SkipReason};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub saved: bool,
    pub skipped: Option<SkipReason>,
    pub save: SaveSnapshot,
}

#[derive(Debug, Serialize)]
pub struct DialogResponse {
    pub dismissed: bool,
}

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub held: bool,
}

/// POST /api/v1/cover-letters/save
///
/// Saves the current result. Repeated calls for the same result and calls
/// while a save is running come back as `skipped`, not as errors.
pub async fn handle_save(State(state): State<AppState>) -> Result<Json<SaveResponse>, AppError> {
    let Some(generation) = state.consumer.snapshot().completed() else {
        return Err(AppError::Conflict(
            "There is no completed cover letter to save".to_string(),
        ));
    };
    let Some(metadata) = state.form.read().await.save_metadata() else {
        return Err(AppError::Validation(
            "Select a job title and years of experience before saving".to_string(),
        ));
    };

    let outcome = state.saver.save(&generation, &metadata).await?;
    let skipped = match outcome {
        SaveOutcome::Saved => None,
        SaveOutcome::Skipped(reason) => Some(reason),
    };
    Ok(Json(SaveResponse {
        saved: skipped.is_none(),
        skipped,
        save: state.saver.snapshot(),
    }))
}

/// GET /api/v1/cover-letters/save
pub async fn handle_save_state(State(state): State<AppState>) -> Json<SaveSnapshot> {
    Json(state.saver.snapshot())
}

/// POST /api/v1/cover-letters/save/dialog/dismiss
pub async fn handle_dismiss_dialog(
    State(state): State<AppState>,
) -> Result<Json<DialogResponse>, AppError> {
    match state.saver.dismiss_dialog() {
        DismissOutcome::Dismissed => Ok(Json(DialogResponse { dismissed: true })),
        DismissOutcome::NotOpen => Ok(Json(DialogResponse { dismissed: false })),
        DismissOutcome::Blocked => Err(AppError::Conflict(
            "The save dialog cannot be closed while the upload is running".to_string(),
        )),
    }
}

/// POST /api/v1/cover-letters/save/dialog/hold
pub async fn handle_hold_dialog(State(state): State<AppState>) -> Json<HoldResponse> {
    Json(HoldResponse {
        held: state.saver.hold_dialog(),
    })
}
