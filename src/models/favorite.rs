// src/models/favorite.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::catalog::BookSummary;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub added_at: DateTime<Utc>,
}

// Favorito com o resumo do livro (mesmas agregações do catálogo)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteBook {
    pub id: i64,
    pub book_id: i64,
    pub added_at: DateTime<Utc>,
    pub book: BookSummary,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoritePayload {
    #[validate(range(min = 1, message = "El libro es obligatorio."))]
    #[schema(example = 2)]
    pub book_id: i64,
}
