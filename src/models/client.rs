// src/models/client.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::User;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "case_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Nouveau,
    EnCours,
    EnAttente,
    Termine,
    Rejete,
}

impl CaseStatus {
    /// Status derivado quando só o índice da etapa mudou.
    pub fn derived_from_step(step_index: usize, total_steps: usize) -> Self {
        if step_index == 0 {
            CaseStatus::Nouveau
        } else if total_steps > 0 && step_index >= total_steps {
            CaseStatus::Termine
        } else {
            CaseStatus::EnCours
        }
    }
}

// --- WORKFLOW ---

/// Uma etapa do workflow. Copiada (snapshot) para dentro do processo na criação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    #[schema(example = "Évaluation du profil")]
    pub title: String,
    pub description: String,
    pub documents: Vec<String>,
    #[schema(example = "1 semaine")]
    pub duration: String,
}

// --- PERFIL DO CLIENTE ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Canada")]
    pub country: String,
    #[schema(example = "Permis de travail")]
    pub visa_type: String,
    pub assigned_employee_id: Option<Uuid>,
    pub assigned_employee_name: Option<String>,
    pub current_status: CaseStatus,
    pub current_step: i32,
    #[schema(example = 30.0)]
    pub progress_percentage: f64,
    pub passport_number: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PROCESSO ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    /// Sempre o ID do usuário dono (role CLIENT), nunca o ID do perfil.
    pub client_id: Uuid,
    pub client_name: String,
    pub assigned_employee_id: Option<Uuid>,
    pub country: String,
    pub visa_type: String,
    #[schema(value_type = Vec<WorkflowStep>)]
    pub workflow_steps: Json<Vec<WorkflowStep>>,
    pub current_step_index: i32,
    pub status: CaseStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn total_steps(&self) -> usize {
        self.workflow_steps.0.len()
    }

    pub fn current_index(&self) -> usize {
        usize::try_from(self.current_step_index).unwrap_or(0)
    }
}

/// Como o cliente ficou vinculado ao funcionário.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Manual,
    Auto,
    ManagerSelf,
    LoadBalanced,
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub assigned_employee_id: Option<Uuid>,
    pub assigned_employee_name: Option<String>,
    pub assignment_type: AssignmentType,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWorkload {
    pub employee_id: Uuid,
    pub full_name: String,
    pub client_count: i64,
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateClientPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "client@mail.com")]
    pub email: String,
    #[validate(length(min = 2, message = "required"))]
    pub full_name: String,
    pub phone: Option<String>,
    #[validate(length(min = 2, message = "required"))]
    #[schema(example = "Canada")]
    pub country: String,
    #[validate(length(min = 2, message = "required"))]
    #[schema(example = "Work Permit")]
    pub visa_type: String,
    pub assigned_employee_id: Option<Uuid>,
    #[serde(default)]
    pub use_load_balancing: bool,
    #[schema(example = "150000")]
    pub first_payment: Option<Decimal>,
    pub currency: Option<String>,
    pub passport_number: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReassignClientPayload {
    pub employee_id: Uuid,
}

/// Campos mutáveis de um processo. Qualquer outro campo é rejeitado.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCasePayload {
    #[validate(range(min = 0, message = "invalid_step"))]
    pub current_step_index: Option<i32>,
    pub status: Option<CaseStatus>,
    #[validate(length(max = 5000, message = "too_long"))]
    pub notes: Option<String>,
}

// --- RESPOSTAS ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreationOutcome {
    pub client_id: Uuid,
    pub case_id: Uuid,
    pub workflow_steps: Vec<WorkflowStep>,
    pub dashboard_ready: bool,
    pub payment_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreatedResponse {
    pub user: User,
    #[serde(flatten)]
    pub outcome: ClientCreationOutcome,
    pub assignment: Assignment,
    pub temporary_password: String,
    pub email_sent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub profile: ClientProfile,
    pub case: Option<Case>,
}
