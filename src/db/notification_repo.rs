// src/db/notification_repo.rs

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::notification::{NewNotification, Notification},
};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification, AppError>;
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>, AppError>;
    /// Idempotente nos dois sentidos. Notificação de outro usuário conta
    /// como inexistente.
    async fn set_read(&self, user_id: i64, id: i64, read: bool) -> Result<Notification, AppError>;
    /// Tudo ou nada: se algum id não for do usuário, nada muda.
    /// `None` marca todas as notificações do usuário.
    async fn mark_many_read(&self, user_id: i64, ids: Option<&[i64]>) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Notification, AppError> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, message, created_at, read
            "#,
        )
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, created_at, read
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn set_read(&self, user_id: i64, id: i64, read: bool) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET read = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, message, created_at, read
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(read)
        .fetch_optional(&self.pool)
        .await?;

        notification.ok_or(AppError::NotificationNotFound(id))
    }

    async fn mark_many_read(&self, user_id: i64, ids: Option<&[i64]>) -> Result<u64, AppError> {
        let Some(ids) = ids else {
            let result = sqlx::query(
                "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
            )
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            return Ok(result.rows_affected());
        };

        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let owned: HashSet<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM notifications WHERE user_id = $1 AND id = ANY($2) FOR UPDATE",
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        // Qualquer id alheio ou inexistente aborta (o drop do tx faz rollback)
        if let Some(missing) = ids.iter().find(|id| !owned.contains(id)) {
            return Err(AppError::NotificationNotFound(*missing));
        }

        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND id = ANY($2) AND read = FALSE",
        )
        .bind(user_id)
        .bind(ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
