// src/db/activity_repo.rs

use serde_json::Value;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{common::error::AppError, models::notification::ActivityLog};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(&self, user_id: Uuid, action: &str, details: Value) -> Result<ActivityLog, AppError> {
        let entry = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO user_activities (user_id, action, details)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, action, details, created_at
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(Json(details))
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
        let entries = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, user_id, action, details, created_at
            FROM user_activities
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
