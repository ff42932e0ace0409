// src/handlers/cases.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::client::{Case, UpdateCasePayload},
};

// GET /api/cases
#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "Cases",
    responses(
        (status = 200, description = "Processos visíveis para o ator", body = Vec<Case>),
        (status = 403, description = "CONSULTANT não acessa processos")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_cases(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Case>>, ApiError> {
    let cases = app_state
        .case_service
        .list_cases(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(cases))
}

// GET /api/cases/{id}
#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = Uuid, Path, description = "ID do processo")),
    responses(
        (status = 200, description = "Processo", body = Case),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Case>, ApiError> {
    let case = app_state
        .case_service
        .get_case(&user.actor(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(case))
}

// PATCH /api/cases/{id}
#[utoipa::path(
    patch,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = Uuid, Path, description = "ID do processo")),
    request_body = UpdateCasePayload,
    responses(
        (status = 200, description = "Processo atualizado", body = Case),
        (status = 400, description = "Campo inválido ou etapa fora do workflow"),
        (status = 403, description = "Somente MANAGER altera processos"),
        (status = 422, description = "Etapa pulada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCasePayload>,
) -> Result<Json<Case>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let case = app_state
        .case_service
        .update_case(&user.actor(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(case))
}

// POST /api/cases/{id}/progress (mesma regra do PATCH)
#[utoipa::path(
    post,
    path = "/api/cases/{id}/progress",
    tag = "Cases",
    params(("id" = Uuid, Path, description = "ID do processo")),
    request_body = UpdateCasePayload,
    responses(
        (status = 200, description = "Progresso registrado", body = Case),
        (status = 422, description = "Etapa pulada")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_progress(
    state: State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    path: Path<Uuid>,
    payload: Json<UpdateCasePayload>,
) -> Result<Json<Case>, ApiError> {
    update_case(state, locale, user, path, payload).await
}
