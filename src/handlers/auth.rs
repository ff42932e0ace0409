// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::{AuthResponse, BootstrapSuperadminPayload, LoginUserPayload, RegisterUserPayload},
};

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Cliente registrado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já existe")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .register_user(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login bem-sucedido", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(response))
}

// POST /api/auth/bootstrap
#[utoipa::path(
    post,
    path = "/api/auth/bootstrap",
    tag = "Auth",
    request_body = BootstrapSuperadminPayload,
    responses(
        (status = 201, description = "SUPERADMIN criado", body = AuthResponse),
        (status = 403, description = "Chave secreta inválida"),
        (status = 409, description = "Já existe um SUPERADMIN")
    )
)]
pub async fn bootstrap(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<BootstrapSuperadminPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .bootstrap_superadmin(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}
