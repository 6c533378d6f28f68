// src/db/opinion_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::opinion::{Opinion, OpinionRow},
};

#[async_trait]
pub trait OpinionRepository: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        book_id: i64,
        rating: i16,
        comment: &str,
    ) -> Result<Opinion, AppError>;
    /// Mais recentes primeiro.
    async fn list_for_book(&self, book_id: i64) -> Result<Vec<OpinionRow>, AppError>;
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<OpinionRow>, AppError>;
}

const SELECT_OPINION_ROW: &str = r#"
    SELECT
        o.id, o.user_id, o.book_id, o.rating, o.comment, o.created_at,
        u.name AS reviewer_name,
        u.last_name AS reviewer_last_name,
        b.title AS book_title
    FROM opinions o
    LEFT JOIN users u ON u.id = o.user_id
    LEFT JOIN books b ON b.id = o.book_id
"#;

#[derive(Clone)]
pub struct PgOpinionRepository {
    pool: PgPool,
}

impl PgOpinionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OpinionRepository for PgOpinionRepository {
    async fn create(
        &self,
        user_id: i64,
        book_id: i64,
        rating: i16,
        comment: &str,
    ) -> Result<Opinion, AppError> {
        let opinion = sqlx::query_as::<_, Opinion>(
            r#"
            INSERT INTO opinions (user_id, book_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, book_id, rating, comment, created_at
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::BookNotFound(book_id)
            }
            _ => e.into(),
        })?;
        Ok(opinion)
    }

    async fn list_for_book(&self, book_id: i64) -> Result<Vec<OpinionRow>, AppError> {
        let sql = format!("{SELECT_OPINION_ROW} WHERE o.book_id = $1 ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OpinionRow>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<OpinionRow>, AppError> {
        let sql = format!("{SELECT_OPINION_ROW} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC");
        let rows = sqlx::query_as::<_, OpinionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
