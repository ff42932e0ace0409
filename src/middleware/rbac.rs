// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::UserRole,
};

/// Conjunto de papéis aceitos por uma rota.
pub trait RoleSet: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
}

/// Guardião por papel. A posse (cliente atribuído etc.) continua nos serviços.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)
            .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

        if !T::allows(user.0.role) {
            tracing::debug!(user_id = %user.0.id, role = %user.0.role, "Papel sem acesso à rota");
            return Err(AppError::PermissionDenied.to_api_error(&locale, app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// CONJUNTOS DE PAPÉIS
// ---

pub struct SuperadminOnly;
impl RoleSet for SuperadminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Superadmin
    }
}

/// MANAGER e SUPERADMIN
pub struct Supervisors;
impl RoleSet for Supervisors {
    fn allows(role: UserRole) -> bool {
        matches!(role, UserRole::Manager | UserRole::Superadmin)
    }
}

/// Todos menos CLIENT
pub struct StaffOnly;
impl RoleSet for StaffOnly {
    fn allows(role: UserRole) -> bool {
        role != UserRole::Client
    }
}

pub struct ClientsOnly;
impl RoleSet for ClientsOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_sets_partition_as_expected() {
        let allowed = |f: fn(UserRole) -> bool| UserRole::ALL.into_iter().filter(|r| f(*r)).count();

        assert_eq!(allowed(SuperadminOnly::allows), 1);
        assert_eq!(allowed(Supervisors::allows), 2);
        assert_eq!(allowed(StaffOnly::allows), 4);
        assert_eq!(allowed(ClientsOnly::allows), 1);
        assert!(!StaffOnly::allows(UserRole::Client));
        assert!(StaffOnly::allows(UserRole::Consultant));
    }
}
