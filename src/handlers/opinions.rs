use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        extract::ApiJson,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::opinion::{CreateOpinionPayload, OpinionView},
};

// POST /api/opinions
#[utoipa::path(
    post,
    path = "/api/opinions",
    tag = "Opiniões",
    request_body = CreateOpinionPayload,
    responses(
        (status = 201, description = "Opinião registrada", body = OpinionView),
        (status = 400, description = "Nota fora de 1..=5 ou comentário vazio"),
        (status = 404, description = "Livro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_opinion(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateOpinionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let opinion = app_state
        .opinion_service
        .create(&user, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(opinion)))
}

// GET /api/opinions/me
#[utoipa::path(
    get,
    path = "/api/opinions/me",
    tag = "Opiniões",
    responses(
        (status = 200, description = "Opiniões do usuário logado", body = Vec<OpinionView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_opinions(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let opinions = app_state
        .opinion_service
        .list_mine(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(opinions))
}
