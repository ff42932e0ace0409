// src/db/workflow_repo.rs

use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{client::WorkflowStep, workflow::WorkflowTemplate},
};

// As chaves (country, visa_type) chegam já normalizadas pelo catálogo.
#[derive(Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

impl WorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, country_key: &str, visa_key: &str) -> Result<Option<WorkflowTemplate>, AppError> {
        let template = sqlx::query_as::<_, WorkflowTemplate>(
            r#"
            SELECT country, visa_type, steps, updated_by, updated_at
            FROM workflow_templates
            WHERE country = $1 AND visa_type = $2
            "#,
        )
        .bind(country_key)
        .bind(visa_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(template)
    }

    // UPSERT (Insert or Update)
    pub async fn upsert(
        &self,
        country_key: &str,
        visa_key: &str,
        steps: &[WorkflowStep],
        updated_by: Uuid,
    ) -> Result<WorkflowTemplate, AppError> {
        let template = sqlx::query_as::<_, WorkflowTemplate>(
            r#"
            INSERT INTO workflow_templates (country, visa_type, steps, updated_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (country, visa_type)
            DO UPDATE SET steps = EXCLUDED.steps, updated_by = EXCLUDED.updated_by, updated_at = NOW()
            RETURNING country, visa_type, steps, updated_by, updated_at
            "#,
        )
        .bind(country_key)
        .bind(visa_key)
        .bind(Json(steps))
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(template)
    }
}
