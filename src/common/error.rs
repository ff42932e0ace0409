// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

/// Categoria estável que o chamador pode usar para decidir o que fazer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    Conflict,
    SequentialViolation,
    Validation,
    Unauthorized,
    Internal,
}

// Nosso tipo de erro de domínio, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido: {field} ({code})")]
    InvalidField { field: &'static str, code: &'static str },

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Conta desativada")]
    AccountDisabled,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Permissão negada")]
    PermissionDenied,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Código de confirmação inválido")]
    ConfirmationCodeMismatch,

    #[error("Pagamento já processado")]
    PaymentAlreadyProcessed,

    #[error("Prospect já convertido em cliente")]
    ProspectAlreadyConverted,

    #[error("Já existe um SUPERADMIN")]
    SuperadminAlreadyExists,

    #[error("Salto de etapa não permitido: {current} -> {requested}")]
    SequentialViolation { current: usize, requested: usize },

    #[error("Etapa {requested} fora do intervalo 0..={total}")]
    StepOutOfRange { requested: usize, total: usize },

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidField { .. }
            | AppError::StepOutOfRange { .. } => ErrorKind::Validation,
            AppError::EmailAlreadyExists
            | AppError::ConfirmationCodeMismatch
            | AppError::PaymentAlreadyProcessed
            | AppError::ProspectAlreadyConverted
            | AppError::SuperadminAlreadyExists => ErrorKind::Conflict,
            AppError::InvalidCredentials | AppError::InvalidToken => ErrorKind::Unauthorized,
            AppError::AccountDisabled | AppError::PermissionDenied => ErrorKind::PermissionDenied,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::SequentialViolation { .. } => ErrorKind::SequentialViolation,
            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidToken | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            _ => match self.kind() {
                ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::SequentialViolation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Chave da mensagem no catálogo de traduções.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => "error.validation",
            AppError::EmailAlreadyExists => "error.email_exists",
            AppError::InvalidCredentials => "error.invalid_credentials",
            AppError::AccountDisabled => "error.account_disabled",
            AppError::InvalidToken => "error.invalid_token",
            AppError::PermissionDenied => "error.permission_denied",
            AppError::NotFound(_) => "error.not_found",
            AppError::ConfirmationCodeMismatch => "error.code_mismatch",
            AppError::PaymentAlreadyProcessed => "error.payment_processed",
            AppError::ProspectAlreadyConverted => "error.prospect_converted",
            AppError::SuperadminAlreadyExists => "error.superadmin_exists",
            AppError::SequentialViolation { .. } => "error.sequential_violation",
            AppError::StepOutOfRange { .. } => "error.step_out_of_range",
            _ => "error.internal",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let codes: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(codes));
                }
                Some(Value::Object(details))
            }
            AppError::InvalidField { field, code } => {
                let mut details = serde_json::Map::new();
                details.insert(field.to_string(), json!([code]));
                Some(Value::Object(details))
            }
            AppError::NotFound(entity) => Some(json!({ "entity": entity })),
            AppError::SequentialViolation { current, requested } => {
                Some(json!({ "currentStepIndex": current, "requestedStepIndex": requested }))
            }
            AppError::StepOutOfRange { requested, total } => {
                Some(json!({ "requestedStepIndex": requested, "totalSteps": total }))
            }
            _ => None,
        }
    }

    /// Converte para a resposta HTTP, traduzindo a mensagem para o idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada; o cliente só vê a genérica.
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        ApiError {
            status,
            error: store.translate(&locale.0, self.message_key()),
            details: self.details(),
        }
    }
}

/// O erro como ele sai pela API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Sem contexto de idioma (ex: middlewares), responde no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        assert_eq!(AppError::PermissionDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("case").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ConfirmationCodeMismatch.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::SequentialViolation { current: 1, requested: 3 }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InvalidField { field: "amount", code: "must_be_positive" }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn field_errors_name_the_offending_field() {
        let err = AppError::InvalidField { field: "rejectionReason", code: "required" };
        let api = err.to_api_error(&Locale("en".into()), I18nStore::global());
        let details = api.details.expect("details");
        assert_eq!(details["rejectionReason"][0], "required");
    }
}
