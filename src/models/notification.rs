// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[schema(example = "Reserva confirmada")]
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
}

// PATCH /api/notifications/{id}  { "read": false }  ({} = lida)
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetReadPayload {
    #[serde(default = "default_read")]
    #[schema(default = true)]
    pub read: bool,
}

fn default_read() -> bool {
    true
}

// POST /api/notifications/read  { "ids": [1, 2] }  (sem ids = todas)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkReadPayload {
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: u64,
}
