// src/db/prospect_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::prospect::{CreateProspectPayload, Prospect, ProspectStatus},
};

const PROSPECT_COLUMNS: &str = "id, name, email, phone, country, visa_type, budget_range, \
     urgency_level, message, status, assigned_to, assigned_to_name, conversion_probability, \
     notes, consultant_notes, potential_client, potential_level, client_user_id, \
     created_at, updated_at";

// Toda escrita de status ignora prospects já convertidos (estado terminal).
// `None` no retorno significa: não existe OU já está convertido.

#[derive(Clone)]
pub struct ProspectRepository {
    pool: PgPool,
}

impl ProspectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        input: &CreateProspectPayload,
        conversion_probability: i32,
    ) -> Result<Prospect, AppError> {
        let prospect = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            INSERT INTO contact_messages (
                name, email, phone, country, visa_type, budget_range, urgency_level,
                message, status, conversion_probability
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'nouveau', $9)
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(input.email.trim().to_lowercase())
        .bind(&input.phone)
        .bind(&input.country)
        .bind(&input.visa_type)
        .bind(&input.budget_range)
        .bind(&input.urgency_level)
        .bind(&input.message)
        .bind(conversion_probability)
        .fetch_one(&self.pool)
        .await?;

        Ok(prospect)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Prospect>, AppError> {
        let prospect = sqlx::query_as::<_, Prospect>(&format!(
            "SELECT {PROSPECT_COLUMNS} FROM contact_messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prospect)
    }

    pub async fn list_all(&self) -> Result<Vec<Prospect>, AppError> {
        let prospects = sqlx::query_as::<_, Prospect>(&format!(
            "SELECT {PROSPECT_COLUMNS} FROM contact_messages ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(prospects)
    }

    pub async fn list_by_assignee(&self, user_id: Uuid) -> Result<Vec<Prospect>, AppError> {
        let prospects = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            SELECT {PROSPECT_COLUMNS} FROM contact_messages
            WHERE assigned_to = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prospects)
    }

    pub async fn list_by_status(&self, status: ProspectStatus) -> Result<Vec<Prospect>, AppError> {
        let prospects = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            SELECT {PROSPECT_COLUMNS} FROM contact_messages
            WHERE status = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(prospects)
    }

    pub async fn assign(
        &self,
        id: Uuid,
        assignee_id: Uuid,
        assignee_name: &str,
        status: ProspectStatus,
        notes: Option<&str>,
    ) -> Result<Option<Prospect>, AppError> {
        let prospect = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            UPDATE contact_messages
            SET assigned_to = $2, assigned_to_name = $3, status = $4,
                notes = COALESCE($5, notes), updated_at = NOW()
            WHERE id = $1 AND status <> 'converti_client'
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(assignee_id)
        .bind(assignee_name)
        .bind(status)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prospect)
    }

    /// Taxa de consulta paga: só sai de "nouveau" ou "assigne".
    pub async fn open_consultation(&self, id: Uuid) -> Result<Option<Prospect>, AppError> {
        let prospect = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            UPDATE contact_messages
            SET status = 'paiement_50k', updated_at = NOW()
            WHERE id = $1 AND status IN ('nouveau', 'assigne')
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prospect)
    }

    /// Salva o parecer do consultor e passa o prospect para "en_consultation".
    /// Exige a taxa de consulta já paga.
    pub async fn save_consultant_notes(
        &self,
        id: Uuid,
        consultant_notes: &str,
        potential_client: bool,
        potential_level: Option<&str>,
    ) -> Result<Option<Prospect>, AppError> {
        let prospect = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            UPDATE contact_messages
            SET consultant_notes = $2, potential_client = $3, potential_level = $4,
                status = 'en_consultation', updated_at = NOW()
            WHERE id = $1 AND status IN ('paiement_50k', 'en_consultation')
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(consultant_notes)
        .bind(potential_client)
        .bind(potential_level)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prospect)
    }

    pub async fn mark_converted(
        &self,
        id: Uuid,
        client_user_id: Uuid,
    ) -> Result<Option<Prospect>, AppError> {
        let prospect = sqlx::query_as::<_, Prospect>(&format!(
            r#"
            UPDATE contact_messages
            SET status = 'converti_client', client_user_id = $2, updated_at = NOW()
            WHERE id = $1 AND status <> 'converti_client'
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(client_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prospect)
    }
}
