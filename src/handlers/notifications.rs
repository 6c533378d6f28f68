// src/handlers/notifications.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::{
        error::ApiError,
        extract::{parse_id, ApiJson},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::notification::{MarkReadPayload, MarkReadResponse, Notification, SetReadPayload},
};

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notificações",
    responses(
        (status = 200, description = "Notificações do usuário, mais recentes primeiro", body = Vec<Notification>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = app_state
        .notification_service
        .list(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(notifications))
}

// PATCH /api/notifications/{id}
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}",
    tag = "Notificações",
    params(("id" = i64, Path, description = "ID da notificação")),
    request_body = SetReadPayload,
    responses(
        (status = 200, description = "Notificação marcada como lida ou não lida", body = Notification),
        (status = 404, description = "Notificação não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
    ApiJson(payload): ApiJson<SetReadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let notification = app_state
        .notification_service
        .mark_read(user.id, id, payload.read)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(notification))
}

// POST /api/notifications/read
#[utoipa::path(
    post,
    path = "/api/notifications/read",
    tag = "Notificações",
    request_body = MarkReadPayload,
    responses(
        (status = 200, description = "Quantidade de notificações marcadas", body = MarkReadResponse),
        (status = 404, description = "Algum id não pertence ao usuário; nada foi alterado")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_notifications_read(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<MarkReadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .notification_service
        .mark_many_read(user.id, payload.ids)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(MarkReadResponse { updated }))
}
