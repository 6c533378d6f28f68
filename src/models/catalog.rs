// src/models/catalog.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

// Situação de um exemplar. É a ÚNICA representação de disponibilidade:
// todo consumidor pergunta via `is_available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    Reserved,
    CheckedOut,
    Lost,
}

impl StockStatus {
    pub fn is_available(self) -> bool {
        matches!(self, StockStatus::Available)
    }
}

// Linha de livro com o nome da categoria já resolvido (LEFT JOIN)
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub synopsis: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub cover_url: Option<String>,
    pub deleted: bool,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Tudo que as agregações precisam de um livro
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub book: Book,
    pub authors: Vec<String>,
    pub stock: Vec<StockStatus>,
    pub ratings: Vec<i16>,
}

// Filtro aplicado no repositório (o resto é feito no serviço)
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub text: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityFilter {
    #[default]
    All,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Title,
    Rating,
    Year,
}

// GET /api/books?q=&category=&availability=&sort=
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// Texto buscado em título, sinopse e editora
    pub q: Option<String>,
    /// Nome exato da categoria (sem diferenciar maiúsculas)
    pub category: Option<String>,
    #[serde(default)]
    #[param(value_type = Option<String>, example = "available")]
    pub availability: AvailabilityFilter,
    #[serde(default)]
    #[param(value_type = Option<String>, example = "rating")]
    pub sort: SortKey,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    #[schema(example = "Gabriel García Márquez")]
    pub author: String,
    pub category: String,
    pub description: String,
    pub cover: String,
    pub available: bool,
    pub available_stock: usize,
    pub total_stock: usize,
    /// Média com uma casa decimal; `null` quando não há opiniões
    #[schema(value_type = Option<f64>, example = 4.5)]
    pub rating: Option<Decimal>,
    pub publish_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    pub id: i64,
    pub title: String,
    pub synopsis: String,
    pub cover: String,
    pub publisher: String,
    pub publication_date: Option<NaiveDate>,
    pub category: String,
    pub authors: Vec<String>,
    pub available: bool,
    pub available_stock: usize,
    pub total_stock: usize,
    #[schema(value_type = Option<f64>, example = 4.0)]
    pub rating: Option<Decimal>,
    pub opinions: Vec<super::opinion::OpinionView>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub id: i64,
    #[schema(example = "Historia")]
    pub name: String,
    pub count: i64,
}
