// src/db/favorite_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{common::error::AppError, models::favorite::Favorite};

#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Idempotente: repetir devolve a linha existente.
    async fn upsert(&self, user_id: i64, book_id: i64) -> Result<Favorite, AppError>;
    /// `false` quando não havia favorito para remover.
    async fn remove(&self, user_id: i64, book_id: i64) -> Result<bool, AppError>;
    async fn find(&self, user_id: i64, book_id: i64) -> Result<Option<Favorite>, AppError>;
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Favorite>, AppError>;
}

#[derive(Clone)]
pub struct PgFavoriteRepository {
    pool: PgPool,
}

impl PgFavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteRepository for PgFavoriteRepository {
    async fn upsert(&self, user_id: i64, book_id: i64) -> Result<Favorite, AppError> {
        // DO UPDATE (e não DO NOTHING) para o RETURNING sempre trazer a linha
        let favorite = sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, book_id)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM books WHERE id = $2 AND deleted = FALSE)
            ON CONFLICT (user_id, book_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, book_id, added_at
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        favorite.ok_or(AppError::BookNotFound(book_id))
    }

    async fn remove(&self, user_id: i64, book_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, user_id: i64, book_id: i64) -> Result<Option<Favorite>, AppError> {
        let favorite = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, user_id, book_id, added_at
            FROM favorites
            WHERE user_id = $1 AND book_id = $2
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(favorite)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Favorite>, AppError> {
        let favorites = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT f.id, f.user_id, f.book_id, f.added_at
            FROM favorites f
            JOIN books b ON b.id = f.book_id AND b.deleted = FALSE
            WHERE f.user_id = $1
            ORDER BY f.added_at DESC, f.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(favorites)
    }
}
