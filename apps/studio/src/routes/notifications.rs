use axum::{extract::State, Json};

use crate::notifications::Notification;
use crate::state::AppState;

/// GET /api/v1/notifications
/// Most recent notifications, oldest first.
pub async fn handle_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifier.recent().await)
}
