// src/handlers/workflows.rs

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, StaffOnly, SuperadminOnly},
    },
    models::workflow::{ResolvedWorkflow, UpsertWorkflowPayload, WorkflowTemplate},
};

// GET /api/workflows/{country}/{visa_type}
#[utoipa::path(
    get,
    path = "/api/workflows/{country}/{visa_type}",
    tag = "Workflows",
    params(
        ("country" = String, Path, description = "País (ex: Canada)"),
        ("visa_type" = String, Path, description = "Tipo de visto (ex: Work Permit)")
    ),
    responses(
        (status = 200, description = "Etapas resolvidas (sobrescrita, catálogo ou vazio)", body = ResolvedWorkflow)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path((country, visa_type)): Path<(String, String)>,
) -> Result<Json<ResolvedWorkflow>, ApiError> {
    let workflow = app_state
        .workflow_service
        .resolve(&country, &visa_type)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(workflow))
}

// PUT /api/workflows/{country}/{visa_type}
#[utoipa::path(
    put,
    path = "/api/workflows/{country}/{visa_type}",
    tag = "Workflows",
    params(
        ("country" = String, Path, description = "País"),
        ("visa_type" = String, Path, description = "Tipo de visto")
    ),
    request_body = UpsertWorkflowPayload,
    responses(
        (status = 200, description = "Sobrescrita gravada", body = WorkflowTemplate),
        (status = 403, description = "Somente SUPERADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_workflow(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<SuperadminOnly>,
    Path((country, visa_type)): Path<(String, String)>,
    Json(payload): Json<UpsertWorkflowPayload>,
) -> Result<Json<WorkflowTemplate>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let template = app_state
        .workflow_service
        .upsert(&user.actor(), &country, &visa_type, &payload.steps)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(template))
}
