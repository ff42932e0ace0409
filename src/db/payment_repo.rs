// src/db/payment_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payment::{NewPayment, PaymentDeclaration},
};

const PAYMENT_COLUMNS: &str = "id, client_id, user_id, prospect_id, client_name, amount, currency, \
     description, payment_method, payment_type, status, declared_at, confirmed_at, confirmed_by, \
     invoice_number, confirmation_code, rejection_reason";

// As transições só acontecem a partir de 'pending' (guardado no WHERE).
// `None` no retorno = o registro não existe ou já saiu de 'pending'.

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LANÇAMENTOS
    // =========================================================================

    pub async fn create_pending(&self, input: &NewPayment) -> Result<PaymentDeclaration, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            r#"
            INSERT INTO payment_declarations (
                client_id, user_id, prospect_id, client_name, amount, currency,
                description, payment_method, payment_type, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(input.client_id)
        .bind(input.user_id)
        .bind(input.prospect_id)
        .bind(&input.client_name)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(&input.description)
        .bind(&input.payment_method)
        .bind(input.payment_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Lançamento direto já confirmado (sem ciclo pending/confirm).
    pub async fn create_confirmed(
        &self,
        input: &NewPayment,
        confirmed_by: Uuid,
        invoice_number: &str,
        confirmed_at: DateTime<Utc>,
    ) -> Result<PaymentDeclaration, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            r#"
            INSERT INTO payment_declarations (
                client_id, user_id, prospect_id, client_name, amount, currency,
                description, payment_method, payment_type, status,
                declared_at, confirmed_at, confirmed_by, invoice_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'confirmed', $10, $10, $11, $12)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(input.client_id)
        .bind(input.user_id)
        .bind(input.prospect_id)
        .bind(&input.client_name)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(&input.description)
        .bind(&input.payment_method)
        .bind(input.payment_type)
        .bind(confirmed_at)
        .bind(confirmed_by)
        .bind(invoice_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentDeclaration>, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_declarations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn find_by_invoice_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<PaymentDeclaration>, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_declarations WHERE invoice_number = $1"
        ))
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn list_all(&self) -> Result<Vec<PaymentDeclaration>, AppError> {
        let payments = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_declarations ORDER BY declared_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    pub async fn list_by_users(&self, user_ids: &[Uuid]) -> Result<Vec<PaymentDeclaration>, AppError> {
        let payments = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payment_declarations
            WHERE user_id = ANY($1)
            ORDER BY declared_at DESC
            "#
        ))
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    pub async fn store_confirmation_code(
        &self,
        id: Uuid,
        code: &str,
    ) -> Result<Option<PaymentDeclaration>, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            r#"
            UPDATE payment_declarations
            SET confirmation_code = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Só confirma se o código bater; o código é consumido.
    pub async fn confirm(
        &self,
        id: Uuid,
        code: &str,
        confirmed_by: Uuid,
        invoice_number: &str,
    ) -> Result<Option<PaymentDeclaration>, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            r#"
            UPDATE payment_declarations
            SET status = 'confirmed', confirmed_at = NOW(), confirmed_by = $3,
                invoice_number = $4, confirmation_code = NULL
            WHERE id = $1 AND status = 'pending' AND confirmation_code = $2
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(code)
        .bind(confirmed_by)
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn reject(
        &self,
        id: Uuid,
        reason: &str,
        rejected_by: Uuid,
    ) -> Result<Option<PaymentDeclaration>, AppError> {
        let payment = sqlx::query_as::<_, PaymentDeclaration>(&format!(
            r#"
            UPDATE payment_declarations
            SET status = 'rejected', rejection_reason = $2, confirmed_by = $3,
                confirmation_code = NULL
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reason)
        .bind(rejected_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}
