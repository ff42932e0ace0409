// src/models/prospect.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Mapeia o CREATE TYPE prospect_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "prospect_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProspectStatus {
    Nouveau,
    Assigne,
    #[sqlx(rename = "paiement_50k")]
    #[serde(rename = "paiement_50k")]
    Paiement50k,
    EnConsultation,
    ConvertiClient,
}

impl ProspectStatus {
    /// `converti_client` é terminal: nenhuma transição sai dele.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProspectStatus::ConvertiClient)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prospect {
    pub id: Uuid,
    #[schema(example = "Fatou Ndiaye")]
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub visa_type: Option<String>,
    #[schema(example = "5000+€")]
    pub budget_range: Option<String>,
    #[schema(example = "Urgent")]
    pub urgency_level: Option<String>,
    pub message: String,
    pub status: ProspectStatus,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    #[schema(example = 85)]
    pub conversion_probability: i32,
    pub notes: Option<String>,
    pub consultant_notes: Option<String>,
    pub potential_client: Option<bool>,
    pub potential_level: Option<String>,
    pub client_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PAYLOADS ---

// Formulário público de contato
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProspectPayload {
    #[validate(length(min = 2, message = "required"))]
    pub name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub visa_type: Option<String>,
    pub budget_range: Option<String>,
    pub urgency_level: Option<String>,
    #[validate(length(min = 10, max = 5000, message = "message_length"))]
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignProspectPayload {
    pub assigned_to: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConsultantNotesPayload {
    #[validate(length(min = 1, message = "required"))]
    pub consultant_notes: String,
    pub potential_client: bool,
    #[schema(example = "eleve")]
    pub potential_level: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConvertProspectPayload {
    #[schema(example = "250000")]
    pub first_payment_amount: Decimal,
    #[validate(length(min = 2, message = "required"))]
    pub country: String,
    #[validate(length(min = 2, message = "required"))]
    pub visa_type: String,
    pub currency: Option<String>,
    pub assigned_employee_id: Option<Uuid>,
}

// --- RESPOSTAS ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultantHandoffResponse {
    pub prospect: Prospect,
    pub payment_id: Uuid,
    pub invoice_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub case_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub temporary_password: String,
    pub email_sent: bool,
}
