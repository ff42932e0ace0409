// src/handlers/prospects.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, StaffOnly, Supervisors},
    },
    models::prospect::{
        AssignProspectPayload, ConsultantHandoffResponse, ConsultantNotesPayload, ConversionResponse,
        ConvertProspectPayload, CreateProspectPayload, Prospect,
    },
};

// POST /api/contact (público)
#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "Prospects",
    request_body = CreateProspectPayload,
    responses(
        (status = 201, description = "Mensagem recebida e pontuada", body = Prospect),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateProspectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let prospect = app_state
        .prospect_service
        .create(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(prospect)))
}

// GET /api/prospects
#[utoipa::path(
    get,
    path = "/api/prospects",
    tag = "Prospects",
    responses(
        (status = 200, description = "Prospects visíveis para o ator", body = Vec<Prospect>),
        (status = 403, description = "CLIENT não acessa prospects")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_prospects(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<StaffOnly>,
) -> Result<Json<Vec<Prospect>>, ApiError> {
    let prospects = app_state
        .prospect_service
        .list(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(prospects))
}

// GET /api/prospects/{id}
#[utoipa::path(
    get,
    path = "/api/prospects/{id}",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospect")),
    responses(
        (status = 200, description = "Prospect", body = Prospect),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Prospect>, ApiError> {
    let prospect = app_state
        .prospect_service
        .get(&user.actor(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(prospect))
}

// PUT /api/prospects/{id}/assign
#[utoipa::path(
    put,
    path = "/api/prospects/{id}/assign",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospect")),
    request_body = AssignProspectPayload,
    responses(
        (status = 200, description = "Prospect atribuído", body = Prospect),
        (status = 404, description = "Prospect ou funcionário não encontrado"),
        (status = 409, description = "Prospect já convertido")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<Supervisors>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignProspectPayload>,
) -> Result<Json<Prospect>, ApiError> {
    let prospect = app_state
        .prospect_service
        .assign(&user.actor(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(prospect))
}

// POST /api/prospects/{id}/assign-consultant
#[utoipa::path(
    post,
    path = "/api/prospects/{id}/assign-consultant",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospect")),
    responses(
        (status = 200, description = "Taxa de consulta lançada e fatura emitida", body = ConsultantHandoffResponse),
        (status = 400, description = "Taxa de consulta já lançada"),
        (status = 409, description = "Prospect já convertido")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_consultant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConsultantHandoffResponse>, ApiError> {
    let response = app_state
        .prospect_service
        .assign_consultant(&user.actor(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(response))
}

// PUT /api/prospects/{id}/consultant-notes
#[utoipa::path(
    put,
    path = "/api/prospects/{id}/consultant-notes",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospect")),
    request_body = ConsultantNotesPayload,
    responses(
        (status = 200, description = "Parecer registrado", body = Prospect),
        (status = 400, description = "Taxa de consulta ainda não paga"),
        (status = 409, description = "Prospect já convertido")
    ),
    security(("api_jwt" = []))
)]
pub async fn consultant_notes(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsultantNotesPayload>,
) -> Result<Json<Prospect>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let prospect = app_state
        .prospect_service
        .consultant_notes(&user.actor(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(prospect))
}

// POST /api/prospects/{id}/convert-to-client
#[utoipa::path(
    post,
    path = "/api/prospects/{id}/convert-to-client",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospect")),
    request_body = ConvertProspectPayload,
    responses(
        (status = 201, description = "Cliente criado a partir do prospect", body = ConversionResponse),
        (status = 403, description = "Papel não pode criar clientes"),
        (status = 409, description = "Prospect já convertido ou e-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn convert_to_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConvertProspectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let response = app_state
        .prospect_service
        .convert(&user, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}
