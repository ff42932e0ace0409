// src/handlers/activities.rs

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, Supervisors},
    },
    models::notification::ActivityLog,
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Máximo de entradas (padrão 100, teto 500)
    pub limit: Option<i64>,
}

impl ActivityQuery {
    fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

// GET /api/activities
#[utoipa::path(
    get,
    path = "/api/activities",
    tag = "Activities",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Últimas atividades registradas", body = Vec<ActivityLog>),
        (status = 403, description = "Somente MANAGER/SUPERADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_activities(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    _guard: RequireRole<Supervisors>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    let activities = app_state
        .activity_repo
        .list_recent(query.effective_limit())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(activities))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(ActivityQuery { limit: None }.effective_limit(), 100);
        assert_eq!(ActivityQuery { limit: Some(0) }.effective_limit(), 1);
        assert_eq!(ActivityQuery { limit: Some(20) }.effective_limit(), 20);
        assert_eq!(ActivityQuery { limit: Some(10_000) }.effective_limit(), 500);
    }
}
