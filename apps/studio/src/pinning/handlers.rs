//! Axum route handler for PDF pinning.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::errors::AppError;
use crate::pinning::IncomingFile;
use crate::remote::PinnedFile;
use crate::state::AppState;

/// POST /api/v1/pins
///
/// Multipart body with a `file` part; responds with the pinned `{url, cid}`.
pub async fn handle_pin(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PinnedFile>, AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        file = Some(IncomingFile {
            file_name,
            content_type,
            bytes,
        });
    }

    let pinned = state.pins.pin(file).await?;
    Ok(Json(pinned))
}
