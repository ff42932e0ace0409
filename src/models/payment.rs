// src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Declaration,  // Declarado pelo cliente
    Consultation, // Taxa fixa de consulta do prospect
    Initial,      // Primeiro pagamento na criação do cliente
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDeclaration {
    pub id: Uuid,
    /// ID do perfil de cliente (quando existe)
    pub client_id: Option<Uuid>,
    /// ID do usuário dono do pagamento
    pub user_id: Option<Uuid>,
    pub prospect_id: Option<Uuid>,
    pub client_name: String,
    #[schema(example = "50000")]
    pub amount: Decimal,
    #[schema(example = "FCFA")]
    pub currency: String,
    pub description: String,
    #[schema(example = "mobile_money")]
    pub payment_method: String,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub declared_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    #[schema(example = "ALO-20250101-9F2C4A1B")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub confirmation_code: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Dados para um lançamento novo no livro.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub client_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub prospect_id: Option<Uuid>,
    pub client_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub payment_method: String,
    pub payment_type: PaymentType,
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeclarePaymentPayload {
    #[schema(example = "75000")]
    pub amount: Decimal,
    pub currency: Option<String>,
    #[validate(length(min = 3, message = "required"))]
    pub description: String,
    #[validate(length(min = 2, message = "required"))]
    pub payment_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentDecision {
    Confirmed,
    Rejected,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmPaymentPayload {
    pub action: PaymentDecision,
    pub confirmation_code: Option<String>,
    pub rejection_reason: Option<String>,
}

// --- RESPOSTAS ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub payment: PaymentDeclaration,
    /// `true` na primeira chamada: o código foi gerado e o status não mudou.
    pub requires_code: bool,
    pub confirmation_code: Option<String>,
}
