// src/handlers/favorites.rs

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
    models::favorite::{AddFavoritePayload, Favorite, FavoriteBook},
};

// GET /api/favorites
#[utoipa::path(
    get,
    path = "/api/favorites",
    tag = "Favoritos",
    responses(
        (status = 200, description = "Favoritos do usuário, mais recentes primeiro", body = Vec<FavoriteBook>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_favorites(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let favorites = app_state
        .favorite_service
        .list(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(favorites))
}

// POST /api/favorites (idempotente)
#[utoipa::path(
    post,
    path = "/api/favorites",
    tag = "Favoritos",
    request_body = AddFavoritePayload,
    responses(
        (status = 200, description = "Livro nos favoritos", body = Favorite),
        (status = 404, description = "Livro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_favorite(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<AddFavoritePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let favorite = app_state
        .favorite_service
        .add(user.id, payload.book_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(favorite)))
}

// GET /api/favorites/{book_id}
#[utoipa::path(
    get,
    path = "/api/favorites/{book_id}",
    tag = "Favoritos",
    params(("book_id" = i64, Path, description = "ID do livro")),
    responses(
        (status = 200, description = "O livro está nos favoritos", body = Favorite),
        (status = 404, description = "NOT_A_FAVORITE")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_favorite(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let book_id = parse_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let favorite = app_state
        .favorite_service
        .get(user.id, book_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(favorite))
}

// DELETE /api/favorites/{book_id}
#[utoipa::path(
    delete,
    path = "/api/favorites/{book_id}",
    tag = "Favoritos",
    params(("book_id" = i64, Path, description = "ID do livro")),
    responses(
        (status = 204, description = "Removido dos favoritos"),
        (status = 404, description = "NOT_A_FAVORITE")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_favorite(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let book_id = parse_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    app_state
        .favorite_service
        .remove(user.id, book_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
