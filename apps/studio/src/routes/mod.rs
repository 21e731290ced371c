pub mod health;
pub mod notifications;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::form::handlers as form;
use crate::generation::handlers as generation;
use crate::pinning::handlers as pinning;
use crate::save::handlers as save;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Form
        .route("/api/v1/taxonomy", get(form::handle_taxonomy))
        .route("/api/v1/form", get(form::handle_get_form))
        .route("/api/v1/form/fields", patch(form::handle_patch_fields))
        .route("/api/v1/form/experience", put(form::handle_set_experience))
        .route(
            "/api/v1/form/role/category",
            post(form::handle_select_category),
        )
        .route(
            "/api/v1/form/role/subcategory",
            post(form::handle_select_subcategory),
        )
        .route("/api/v1/form/role/title", post(form::handle_select_title))
        .route(
            "/api/v1/model-params",
            get(form::handle_get_model_params).put(form::handle_set_model_params),
        )
        // Generation
        .route(
            "/api/v1/generation",
            get(generation::handle_snapshot).post(generation::handle_submit),
        )
        .route("/api/v1/generation/stop", post(generation::handle_stop))
        .route("/api/v1/generation/events", get(generation::handle_events))
        .route(
            "/api/v1/generation/rendered",
            get(generation::handle_rendered),
        )
        // Save
        .route(
            "/api/v1/cover-letters/save",
            get(save::handle_save_state).post(save::handle_save),
        )
        .route(
            "/api/v1/cover-letters/save/dialog/dismiss",
            post(save::handle_dismiss_dialog),
        )
        .route(
            "/api/v1/cover-letters/save/dialog/hold",
            post(save::handle_hold_dialog),
        )
        // Pinning
        .route("/api/v1/pins", post(pinning::handle_pin))
        .route(
            "/api/v1/notifications",
            get(notifications::handle_notifications),
        )
        .with_state(state)
}
