// src/handlers/notifications.rs

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::notification::{Notification, UnreadCount},
};

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    responses(
        (status = 200, description = "Notificações do usuário (mais recentes primeiro)", body = Vec<Notification>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = app_state
        .notification_service
        .list_mine(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(notifications))
}

// GET /api/notifications/unread-count
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses(
        (status = 200, description = "Total de não lidas", body = UnreadCount)
    ),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UnreadCount>, ApiError> {
    let count = app_state
        .notification_service
        .unread_count(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(count))
}

// PUT /api/notifications/{id}/read
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "ID da notificação")),
    responses(
        (status = 200, description = "Marcada como lida", body = Notification),
        (status = 404, description = "Não encontrada (ou de outro usuário)")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = app_state
        .notification_service
        .mark_read(id, user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(notification))
}

// PUT /api/notifications/read-all
#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses(
        (status = 200, description = "Quantidade marcada como lida")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_all_read(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let updated = app_state
        .notification_service
        .mark_all_read(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(json!({ "updated": updated })))
}
