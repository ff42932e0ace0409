// src/db/case_repo.rs

use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::client::{Case, CaseStatus, WorkflowStep},
};

const CASE_COLUMNS: &str = "id, client_id, client_name, assigned_employee_id, country, visa_type, \
     workflow_steps, current_step_index, status, notes, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewCase {
    /// ID do usuário dono
    pub client_id: Uuid,
    pub client_name: String,
    pub assigned_employee_id: Option<Uuid>,
    pub country: String,
    pub visa_type: String,
    pub workflow_steps: Vec<WorkflowStep>,
}

/// Valores finais de um update (já validados pelo serviço).
#[derive(Debug, Clone)]
pub struct CaseChanges {
    /// Índice lido antes da validação; o UPDATE só passa se ainda for ele.
    pub expected_step_index: i32,
    pub current_step_index: i32,
    pub status: CaseStatus,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct CaseRepository {
    pool: PgPool,
}

impl CaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_case(&self, input: &NewCase) -> Result<Case, AppError> {
        let case = sqlx::query_as::<_, Case>(&format!(
            r#"
            INSERT INTO cases (
                client_id, client_name, assigned_employee_id, country, visa_type,
                workflow_steps, current_step_index, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, 'nouveau')
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(input.client_id)
        .bind(&input.client_name)
        .bind(input.assigned_employee_id)
        .bind(&input.country)
        .bind(&input.visa_type)
        .bind(Json(&input.workflow_steps))
        .fetch_one(&self.pool)
        .await?;

        Ok(case)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Case>, AppError> {
        let case = sqlx::query_as::<_, Case>(&format!(
            "SELECT {CASE_COLUMNS} FROM cases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(case)
    }

    /// Processo mais recente de um cliente (junção por ID do usuário dono).
    pub async fn find_latest_by_client(&self, client_user_id: Uuid) -> Result<Option<Case>, AppError> {
        let case = sqlx::query_as::<_, Case>(&format!(
            r#"
            SELECT {CASE_COLUMNS} FROM cases
            WHERE client_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(client_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(case)
    }

    pub async fn list_all(&self) -> Result<Vec<Case>, AppError> {
        let cases = sqlx::query_as::<_, Case>(&format!(
            "SELECT {CASE_COLUMNS} FROM cases ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(cases)
    }

    pub async fn list_by_client(&self, client_user_id: Uuid) -> Result<Vec<Case>, AppError> {
        let cases = sqlx::query_as::<_, Case>(&format!(
            "SELECT {CASE_COLUMNS} FROM cases WHERE client_id = $1 ORDER BY created_at DESC"
        ))
        .bind(client_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cases)
    }

    pub async fn list_by_employee(&self, employee_id: Uuid) -> Result<Vec<Case>, AppError> {
        let cases = sqlx::query_as::<_, Case>(&format!(
            r#"
            SELECT {CASE_COLUMNS} FROM cases
            WHERE assigned_employee_id = $1
            ORDER BY updated_at DESC
            "#
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cases)
    }

    pub async fn apply_changes(&self, id: Uuid, changes: &CaseChanges) -> Result<Option<Case>, AppError> {
        let case = sqlx::query_as::<_, Case>(&format!(
            r#"
            UPDATE cases
            SET current_step_index = $2, status = $3, notes = $4, updated_at = NOW()
            WHERE id = $1 AND current_step_index = $5
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.current_step_index)
        .bind(changes.status)
        .bind(&changes.notes)
        .bind(changes.expected_step_index)
        .fetch_optional(&self.pool)
        .await?;

        Ok(case)
    }

    /// Propaga a nova atribuição para todos os processos do cliente.
    pub async fn update_assignment_for_client(
        &self,
        client_user_id: Uuid,
        employee_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE cases SET assigned_employee_id = $2, updated_at = NOW() WHERE client_id = $1",
        )
        .bind(client_user_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
