// src/models/opinion.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Opinion {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    #[schema(example = 5)]
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// Opinião com autor e título resolvidos (JOIN com users / books)
#[derive(Debug, Clone, FromRow)]
pub struct OpinionRow {
    #[sqlx(flatten)]
    pub opinion: Opinion,
    pub reviewer_name: Option<String>,
    pub reviewer_last_name: Option<String>,
    pub book_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpinionView {
    pub id: i64,
    pub book_id: i64,
    pub book_title: Option<String>,
    pub comment: String,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
    #[schema(example = "Lucía Fernández")]
    pub reviewer: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpinionPayload {
    #[validate(range(min = 1, message = "El libro es obligatorio."))]
    pub book_id: i64,
    #[validate(range(min = 1, max = 5, message = "La calificación debe estar entre 1 y 5."))]
    #[schema(example = 4)]
    pub rating: i16,
    #[validate(length(min = 1, max = 2000, message = "El comentario es obligatorio."))]
    pub comment: String,
}
