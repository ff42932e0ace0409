// src/handlers/clients.rs

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
        rbac::{ClientsOnly, RequireRole, Supervisors},
    },
    models::client::{
        ClientCreatedResponse, ClientDashboard, ClientProfile, CreateClientPayload, EmployeeWorkload,
        ReassignClientPayload,
    },
    services::client_service::OnboardRequest,
};

// =============================================================================
//  CRIAÇÃO
// =============================================================================

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Cliente, perfil e processo criados", body = ClientCreatedResponse),
        (status = 403, description = "Papel não pode criar clientes"),
        (status = 404, description = "Funcionário informado não existe"),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let created = app_state
        .client_service
        .onboard_client(&user, &OnboardRequest::from(payload))
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// =============================================================================
//  LEITURAS
// =============================================================================

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    responses(
        (status = 200, description = "Clientes visíveis", body = Vec<ClientProfile>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ClientProfile>>, ApiError> {
    let clients = app_state
        .client_service
        .list_clients(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(clients))
}

// GET /api/clients/{id}
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do perfil de cliente")),
    responses(
        (status = 200, description = "Perfil do cliente", body = ClientProfile),
        (status = 403, description = "Sem acesso"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientProfile>, ApiError> {
    let client = app_state
        .client_service
        .get_client(&user.actor(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(client))
}

// GET /api/clients/me/dashboard
#[utoipa::path(
    get,
    path = "/api/clients/me/dashboard",
    tag = "Clients",
    responses(
        (status = 200, description = "Perfil e processo do cliente autenticado", body = ClientDashboard),
        (status = 404, description = "Perfil ainda não criado")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<ClientsOnly>,
) -> Result<Json<ClientDashboard>, ApiError> {
    let dashboard = app_state
        .client_service
        .my_dashboard(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(dashboard))
}

// =============================================================================
//  ATRIBUIÇÃO
// =============================================================================

// PUT /api/clients/{id}/assign
#[utoipa::path(
    put,
    path = "/api/clients/{id}/assign",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do perfil de cliente")),
    request_body = ReassignClientPayload,
    responses(
        (status = 200, description = "Cliente reatribuído", body = ClientProfile),
        (status = 403, description = "Somente MANAGER/SUPERADMIN"),
        (status = 404, description = "Cliente ou funcionário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reassign_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<Supervisors>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignClientPayload>,
) -> Result<Json<ClientProfile>, ApiError> {
    let updated = app_state
        .assignment_service
        .reassign_client(&user.actor(), id, payload.employee_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(updated))
}

// GET /api/clients/workload
#[utoipa::path(
    get,
    path = "/api/clients/workload",
    tag = "Clients",
    responses(
        (status = 200, description = "Clientes por funcionário ativo", body = Vec<EmployeeWorkload>)
    ),
    security(("api_jwt" = []))
)]
pub async fn employee_workload(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<Supervisors>,
) -> Result<Json<Vec<EmployeeWorkload>>, ApiError> {
    let workload = app_state
        .assignment_service
        .employee_workload(&user.actor())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(workload))
}
