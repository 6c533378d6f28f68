// src/handlers/books.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::{
        error::{ApiError, AppError},
        extract::parse_id,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        catalog::{BookDetail, BookSummary, CatalogQuery, CategoryCount},
        opinion::OpinionView,
    },
};

// GET /api/books
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "Catálogo",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Livros do catálogo", body = Vec<BookSummary>),
        (status = 400, description = "Parâmetro inválido")
    )
)]
pub async fn list_books(
    State(app_state): State<AppState>,
    locale: Locale,
    query: Result<Query<CatalogQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()).to_api_error(&locale))?;

    let books = app_state
        .catalog_service
        .list_books(query)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(books))
}

// GET /api/books/featured
#[utoipa::path(
    get,
    path = "/api/books/featured",
    tag = "Catálogo",
    responses(
        (status = 200, description = "Os 4 livros mais recentes", body = Vec<BookSummary>)
    )
)]
pub async fn featured_books(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let books = app_state
        .catalog_service
        .featured()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(books))
}

// GET /api/books/{id}
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "Catálogo",
    params(("id" = i64, Path, description = "ID do livro")),
    responses(
        (status = 200, description = "Detalhe do livro", body = BookDetail),
        (status = 400, description = "ID inválido"),
        (status = 404, description = "Livro não encontrado")
    )
)]
pub async fn get_book(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let book = app_state
        .catalog_service
        .book_detail(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(book))
}

// GET /api/books/{id}/opinions
#[utoipa::path(
    get,
    path = "/api/books/{id}/opinions",
    tag = "Opiniões",
    params(("id" = i64, Path, description = "ID do livro")),
    responses(
        (status = 200, description = "Opiniões do livro, mais recentes primeiro", body = Vec<OpinionView>),
        (status = 404, description = "Livro não encontrado")
    )
)]
pub async fn book_opinions(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id).map_err(|e| e.to_api_error(&locale))?;

    let opinions = app_state
        .catalog_service
        .book_opinions(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(opinions))
}

// GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catálogo",
    responses(
        (status = 200, description = "Categorias com a contagem de livros", body = Vec<CategoryCount>)
    )
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .catalog_service
        .categories()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(categories))
}
