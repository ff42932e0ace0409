// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{user_repo::NewUser, UserRepository},
    models::auth::{AuthResponse, BootstrapSuperadminPayload, Claims, RegisterUserPayload, User, UserRole},
};

const TOKEN_TTL_DAYS: i64 = 7;
const TEMP_PASSWORD_LEN: usize = 12;

/// Senha temporária para contas criadas pela equipe.
pub fn generate_temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Primeiro SUPERADMIN é livre; os seguintes exigem a chave configurada.
pub fn check_superadmin_bootstrap(
    superadmin_exists: bool,
    configured_secret: Option<&str>,
    provided_secret: Option<&str>,
) -> Result<(), AppError> {
    if !superadmin_exists {
        return Ok(());
    }

    match (configured_secret, provided_secret) {
        (_, None) => Err(AppError::SuperadminAlreadyExists),
        (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
        _ => Err(AppError::PermissionDenied),
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    superadmin_secret: Option<String>,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, superadmin_secret: Option<String>) -> Self {
        Self { user_repo, jwt_secret, superadmin_secret }
    }

    // --- SENHAS ---

    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password_clone = password.to_owned();
        let password_hash_clone = password_hash.to_owned();

        // Executa a verificação em um thread separado
        let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(is_valid)
    }

    // --- CONTAS ---

    /// Cria a conta com a senha já definida (ou gerada por quem chama).
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        phone: Option<&str>,
        role: UserRole,
        created_by: Option<Uuid>,
    ) -> Result<User, AppError> {
        let password_hash = self.hash_password(password).await?;

        self.user_repo
            .create_user(&NewUser {
                email: email.to_string(),
                password_hash,
                full_name: full_name.to_string(),
                phone: phone.map(str::to_string),
                role,
                created_by,
            })
            .await
    }

    // Registro público: sempre CLIENT
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<AuthResponse, AppError> {
        let user = self
            .create_account(
                &payload.email,
                &payload.password,
                &payload.full_name,
                payload.phone.as_deref(),
                UserRole::Client,
                None,
            )
            .await?;

        tracing::info!(user_id = %user.id, "Novo cliente registrado");
        let token = self.create_token(user.id)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn bootstrap_superadmin(
        &self,
        payload: &BootstrapSuperadminPayload,
    ) -> Result<AuthResponse, AppError> {
        let exists = self.user_repo.exists_active_with_role(UserRole::Superadmin).await?;
        check_superadmin_bootstrap(
            exists,
            self.superadmin_secret.as_deref(),
            payload.secret_key.as_deref(),
        )?;

        let user = self
            .create_account(
                &payload.email,
                &payload.password,
                &payload.full_name,
                payload.phone.as_deref(),
                UserRole::Superadmin,
                None,
            )
            .await?;

        tracing::info!(user_id = %user.id, "SUPERADMIN criado");
        let token = self.create_token(user.id)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        let token = self.create_token(user.id)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if !self.verify_password(current_password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let new_hash = self.hash_password(new_password).await?;
        self.user_repo.update_password(user.id, &new_hash).await
    }

    // --- TOKENS ---

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_passwords_are_alphanumeric_and_fresh() {
        let a = generate_temporary_password();
        let b = generate_temporary_password();
        assert_eq!(a.len(), TEMP_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn first_superadmin_needs_no_secret() {
        assert!(check_superadmin_bootstrap(false, None, None).is_ok());
        assert!(check_superadmin_bootstrap(false, Some("s3cret"), Some("wrong")).is_ok());
    }

    #[test]
    fn further_superadmins_need_the_configured_secret() {
        assert!(matches!(
            check_superadmin_bootstrap(true, Some("s3cret"), None),
            Err(AppError::SuperadminAlreadyExists)
        ));
        assert!(matches!(
            check_superadmin_bootstrap(true, Some("s3cret"), Some("nope")),
            Err(AppError::PermissionDenied)
        ));
        assert!(matches!(
            check_superadmin_bootstrap(true, None, Some("anything")),
            Err(AppError::PermissionDenied)
        ));
        assert!(matches!(
            check_superadmin_bootstrap(true, Some(""), Some("")),
            Err(AppError::PermissionDenied)
        ));
        assert!(check_superadmin_bootstrap(true, Some("s3cret"), Some("s3cret")).is_ok());
    }
}
