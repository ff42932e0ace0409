// src/db/notification_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::notification::{Notification, NotificationType},
};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, notification_type, related_id, read, created_at";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Um registro por destinatário, nunca em lote
    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        notification_type: NotificationType,
        related_id: Option<Uuid>,
    ) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, related_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(notification_type)
        .bind(related_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn count_unread(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// A única mutação permitida numa notificação é o flag de leitura.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>, AppError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
