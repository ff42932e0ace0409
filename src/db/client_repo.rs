// src/db/client_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::client::{CaseStatus, ClientProfile},
};

const CLIENT_COLUMNS: &str = "id, user_id, full_name, email, phone, country, visa_type, \
     assigned_employee_id, assigned_employee_name, current_status, current_step, \
     progress_percentage, passport_number, address, notes, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewClientProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub visa_type: String,
    pub assigned_employee_id: Option<Uuid>,
    pub assigned_employee_name: Option<String>,
    pub passport_number: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sempre nasce em "nouveau", etapa 0, progresso 0.
    pub async fn create_profile(&self, input: &NewClientProfile) -> Result<ClientProfile, AppError> {
        let profile = sqlx::query_as::<_, ClientProfile>(&format!(
            r#"
            INSERT INTO clients (
                user_id, full_name, email, phone, country, visa_type,
                assigned_employee_id, assigned_employee_name,
                current_status, current_step, progress_percentage,
                passport_number, address, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'nouveau', 0, 0, $9, $10, $11, $12)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(input.user_id)
        .bind(&input.full_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.country)
        .bind(&input.visa_type)
        .bind(input.assigned_employee_id)
        .bind(&input.assigned_employee_name)
        .bind(&input.passport_number)
        .bind(&input.address)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClientProfile>, AppError> {
        let profile = sqlx::query_as::<_, ClientProfile>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<ClientProfile>, AppError> {
        let profile = sqlx::query_as::<_, ClientProfile>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn list_all(&self) -> Result<Vec<ClientProfile>, AppError> {
        let profiles = sqlx::query_as::<_, ClientProfile>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    pub async fn list_by_employee(&self, employee_id: Uuid) -> Result<Vec<ClientProfile>, AppError> {
        let profiles = sqlx::query_as::<_, ClientProfile>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM clients
            WHERE assigned_employee_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    /// Carga atual do funcionário (leitura sem lock).
    pub async fn count_by_employee(&self, employee_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE assigned_employee_id = $1")
                .bind(employee_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn update_assignment(
        &self,
        client_id: Uuid,
        employee_id: Uuid,
        employee_name: &str,
    ) -> Result<Option<ClientProfile>, AppError> {
        let profile = sqlx::query_as::<_, ClientProfile>(&format!(
            r#"
            UPDATE clients
            SET assigned_employee_id = $2, assigned_employee_name = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(employee_id)
        .bind(employee_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Espelho do processo: etapa, progresso e status.
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        current_step: i32,
        progress_percentage: f64,
        status: CaseStatus,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET current_step = $2, progress_percentage = $3, current_status = $4, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(current_step)
        .bind(progress_percentage)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
