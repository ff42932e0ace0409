// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Superadmin,
    Manager,
    Employee,
    Consultant,
    Client,
}

impl UserRole {
    /// Nível na hierarquia. CONSULTANT é uma folha paralela, sem poder de criação.
    pub fn level(self) -> u8 {
        match self {
            UserRole::Superadmin => 4,
            UserRole::Manager => 3,
            UserRole::Employee => 2,
            UserRole::Client => 1,
            UserRole::Consultant => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Superadmin => "SUPERADMIN",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
            UserRole::Consultant => "CONSULTANT",
            UserRole::Client => "CLIENT",
        }
    }

    pub const ALL: [UserRole; 5] = [
        UserRole::Superadmin,
        UserRole::Manager,
        UserRole::Employee,
        UserRole::Consultant,
        UserRole::Client,
    ];
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "agent@alo.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "Awa Diallo")]
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub password_changed: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// O ator da requisição: só o que a camada de política precisa saber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self { id: user.id, role: user.role }
    }
}

// --- PAYLOADS ---

// Dados para registro de um novo usuário (sempre CLIENT)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "client@mail.com")]
    pub email: String,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub password: String,
    #[validate(length(min = 2, message = "required"))]
    #[schema(example = "Moussa Traoré")]
    pub full_name: String,
    pub phone: Option<String>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

// Criação do SUPERADMIN (primeiro livre, os seguintes exigem a chave secreta)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BootstrapSuperadminPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub password: String,
    #[validate(length(min = 2, message = "required"))]
    pub full_name: String,
    pub phone: Option<String>,
    pub secret_key: Option<String>,
}

// Criação de usuários da equipe (hierarquia de papéis)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "employee@alo.com")]
    pub email: String,
    #[validate(length(min = 2, message = "required"))]
    pub full_name: String,
    pub phone: Option<String>,
    #[schema(example = "EMPLOYEE")]
    pub role: UserRole,
    /// Senha inicial; se ausente, uma senha temporária é gerada.
    #[validate(length(min = 8, message = "password_too_short"))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRolePayload {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub new_password: String,
}

// --- RESPOSTAS ---

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedResponse {
    pub user: User,
    /// Só é devolvida quando foi gerada pelo servidor.
    pub temporary_password: Option<String>,
    pub email_sent: bool,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}
