// src/models/workflow.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::client::WorkflowStep;

// Sobrescrita persistida (tem prioridade sobre o catálogo embutido)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub country: String,
    pub visa_type: String,
    #[schema(value_type = Vec<WorkflowStep>)]
    pub steps: Json<Vec<WorkflowStep>>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    Override,
    Catalog,
    None,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedWorkflow {
    pub country: String,
    /// Tipo de visto já normalizado para o rótulo do catálogo
    pub visa_type: String,
    pub source: TemplateSource,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpsertWorkflowPayload {
    #[validate(length(min = 1, message = "required"))]
    pub steps: Vec<WorkflowStep>,
}
