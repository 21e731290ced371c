//! Axum route handlers for the form: taxonomy, field edits, role picking and
//! the model dials.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::form::models::{ExperienceBucket, ModelParams, TextField};
use crate::form::state::FormSnapshot;
use crate::form::taxonomy::{Category, JOB_CATEGORIES};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyResponse {
    pub categories: &'static [Category],
    pub experience_buckets: [ExperienceBucket; 5],
}

#[derive(Debug, Deserialize)]
pub struct FieldsPatch {
    pub fields: BTreeMap<TextField, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceUpdate {
    pub years_of_experience: ExperienceBucket,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub name: String,
}

/// GET /api/v1/taxonomy
pub async fn handle_taxonomy() -> Json<TaxonomyResponse> {
    Json(TaxonomyResponse {
        categories: JOB_CATEGORIES,
        experience_buckets: ExperienceBucket::ALL,
    })
}

/// GET /api/v1/form
pub async fn handle_get_form(State(state): State<AppState>) -> Json<FormSnapshot> {
    Json(state.form.read().await.snapshot())
}

/// PATCH /api/v1/form/fields
///
/// Sets free-text fields. Narrative fields are revalidated as they change.
pub async fn handle_patch_fields(
    State(state): State<AppState>,
    Json(patch): Json<FieldsPatch>,
) -> Json<FormSnapshot> {
    let mut form = state.form.write().await;
    for (field, value) in patch.fields {
        form.set_text(field, value);
    }
    Json(form.snapshot())
}

/// PUT /api/v1/form/experience
pub async fn handle_set_experience(
    State(state): State<AppState>,
    Json(update): Json<ExperienceUpdate>,
) -> Json<FormSnapshot> {
    let mut form = state.form.write().await;
    form.set_experience(update.years_of_experience);
    Json(form.snapshot())
}

/// POST /api/v1/form/role/category
pub async fn handle_select_category(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<FormSnapshot>, AppError> {
    let mut form = state.form.write().await;
    form.select_category(&req.name)?;
    Ok(Json(form.snapshot()))
}

/// POST /api/v1/form/role/subcategory
pub async fn handle_select_subcategory(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<FormSnapshot>, AppError> {
    let mut form = state.form.write().await;
    form.select_subcategory(&req.name)?;
    Ok(Json(form.snapshot()))
}

/// POST /api/v1/form/role/title
pub async fn handle_select_title(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<FormSnapshot>, AppError> {
    let mut form = state.form.write().await;
    form.select_title(&req.name)?;
    Ok(Json(form.snapshot()))
}

/// GET /api/v1/model-params
pub async fn handle_get_model_params(State(state): State<AppState>) -> Json<ModelParams> {
    Json(*state.model_params.read().await)
}

/// PUT /api/v1/model-params
pub async fn handle_set_model_params(
    State(state): State<AppState>,
    Json(params): Json<ModelParams>,
) -> Result<Json<ModelParams>, AppError> {
    let params = params.validated()?;
    *state.model_params.write().await = params;
    Ok(Json(params))
}
