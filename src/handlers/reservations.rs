// src/handlers/reservations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        extract::{parse_id, ApiJson},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::reservation::{
        CreateReservationPayload, Reservation, ReservationWithBook, UpdateReservationPayload,
    },
};

// GET /api/reservations
#[utoipa::path(
    get,
    path = "/api/reservations",
    tag = "Reservas",
    responses(
        (status = 200, description = "Reservas do usuário", body = Vec<ReservationWithBook>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_reservations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = app_state
        .reservation_service
        .list_mine(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(reservations))
}

// POST /api/reservations
#[utoipa::path(
    post,
    path = "/api/reservations",
    tag = "Reservas",
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Reserva criada (pendiente ou espera)", body = Reservation),
        (status = 404, description = "Livro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateReservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let reservation = app_state
        .reservation_service
        .create(&user, payload.book_id, payload.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

// PATCH /api/reservations/{id}
#[utoipa::path(
    patch,
    path = "/api/reservations/{id}",
    tag = "Reservas",
    request_body = UpdateReservationPayload,
    params(("id" = i64, Path, description = "ID da reserva")),
    responses(
        (status = 200, description = "Status atualizado", body = Reservation),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Reserva não encontrada"),
        (status = 409, description = "ILLEGAL_TRANSITION ou NO_COPY_AVAILABLE")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateReservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let reservation = app_state
        .reservation_service
        .update_status(&user, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(reservation))
}
