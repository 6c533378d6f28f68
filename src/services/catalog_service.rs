// src/services/catalog_service.rs

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Datelike;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::{error::AppError, fallback, retry::RetryPolicy},
    db::{CatalogRepository, OpinionRepository},
    models::{
        catalog::{
            AvailabilityFilter, BookDetail, BookFilter, BookRecord, BookSummary, CatalogQuery,
            CategoryCount, SortKey, StockStatus,
        },
        opinion::{OpinionRow, OpinionView},
    },
};

pub const FEATURED_LIMIT: i64 = 4;

// =============================================================================
//  AGREGAÇÕES (funções puras, recalculadas a cada leitura)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub available: usize,
    pub total: usize,
}

impl Availability {
    pub fn from_stock(stock: &[StockStatus]) -> Self {
        Self {
            available: stock.iter().filter(|s| s.is_available()).count(),
            total: stock.len(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available > 0
    }
}

/// Média com uma casa decimal (meio arredonda para longe do zero).
/// Sem opiniões não há nota: `None`.
pub fn average_rating(ratings: &[i16]) -> Option<Decimal> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = Decimal::from(sum) / Decimal::from(ratings.len() as i64);
    Some(mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}

// =============================================================================
//  APRESENTAÇÃO (único ponto onde os valores padrão são aplicados)
// =============================================================================

pub fn present_summary(record: &BookRecord) -> BookSummary {
    let availability = Availability::from_stock(&record.stock);
    let book = &record.book;
    BookSummary {
        id: book.id,
        title: book.title.clone(),
        author: fallback::author_line(&record.authors),
        category: fallback::category(book.category_name.as_deref()),
        description: fallback::synopsis(book.synopsis.as_deref()),
        cover: fallback::cover(book.cover_url.as_deref()),
        available: availability.is_available(),
        available_stock: availability.available,
        total_stock: availability.total,
        rating: average_rating(&record.ratings),
        publish_year: book.publication_date.map(|d| d.year()),
    }
}

pub fn present_detail(record: &BookRecord, opinions: &[OpinionRow]) -> BookDetail {
    let availability = Availability::from_stock(&record.stock);
    let book = &record.book;
    BookDetail {
        id: book.id,
        title: book.title.clone(),
        synopsis: fallback::synopsis(book.synopsis.as_deref()),
        cover: fallback::cover(book.cover_url.as_deref()),
        publisher: fallback::publisher(book.publisher.as_deref()),
        publication_date: book.publication_date,
        category: fallback::category(book.category_name.as_deref()),
        authors: if record.authors.is_empty() {
            vec![fallback::UNKNOWN_AUTHOR.to_string()]
        } else {
            record.authors.clone()
        },
        available: availability.is_available(),
        available_stock: availability.available,
        total_stock: availability.total,
        rating: average_rating(&record.ratings),
        opinions: opinions.iter().map(present_opinion).collect(),
    }
}

pub fn present_opinion(row: &OpinionRow) -> OpinionView {
    OpinionView {
        id: row.opinion.id,
        book_id: row.opinion.book_id,
        book_title: row.book_title.clone(),
        comment: row.opinion.comment.clone(),
        rating: row.opinion.rating,
        created_at: row.opinion.created_at,
        reviewer: fallback::reviewer(row.reviewer_name.as_deref(), row.reviewer_last_name.as_deref()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn sort_summaries(books: &mut [BookSummary], key: SortKey) {
    match key {
        SortKey::Title => books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.id.cmp(&b.id))
        }),
        // Sem nota / sem ano vão para o fim
        SortKey::Rating => books.sort_by(|a, b| desc_nones_last(a.rating, b.rating).then(a.id.cmp(&b.id))),
        SortKey::Year => {
            books.sort_by(|a, b| desc_nones_last(a.publish_year, b.publish_year).then(a.id.cmp(&b.id)))
        }
    }
}

fn desc_nones_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    opinions: Arc<dyn OpinionRepository>,
    retry: RetryPolicy,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        opinions: Arc<dyn OpinionRepository>,
        retry: RetryPolicy,
    ) -> Self {
        Self { catalog, opinions, retry }
    }

    pub async fn list_books(&self, query: CatalogQuery) -> Result<Vec<BookSummary>, AppError> {
        let filter = &BookFilter {
            text: non_blank(query.q),
            category: non_blank(query.category),
        };
        let catalog = &*self.catalog;
        let records = self
            .retry
            .run("list_books", move || catalog.list_books(filter))
            .await?;

        let mut books: Vec<BookSummary> = records
            .iter()
            .map(present_summary)
            .filter(|b| match query.availability {
                AvailabilityFilter::All => true,
                AvailabilityFilter::Available => b.available,
                AvailabilityFilter::Unavailable => !b.available,
            })
            .collect();
        sort_summaries(&mut books, query.sort);
        Ok(books)
    }

    pub async fn featured(&self) -> Result<Vec<BookSummary>, AppError> {
        let catalog = &*self.catalog;
        let records = self
            .retry
            .run("featured_books", move || catalog.latest_books(FEATURED_LIMIT))
            .await?;
        Ok(records.iter().map(present_summary).collect())
    }

    pub async fn book_detail(&self, id: i64) -> Result<BookDetail, AppError> {
        let record = self.find_record(id).await?;
        let opinions = &*self.opinions;
        let rows = self
            .retry
            .run("book_opinions", move || opinions.list_for_book(id))
            .await?;
        Ok(present_detail(&record, &rows))
    }

    pub async fn book_opinions(&self, id: i64) -> Result<Vec<OpinionView>, AppError> {
        // 404 para livro inexistente, não uma lista vazia
        self.find_record(id).await?;
        let opinions = &*self.opinions;
        let rows = self
            .retry
            .run("book_opinions", move || opinions.list_for_book(id))
            .await?;
        Ok(rows.iter().map(present_opinion).collect())
    }

    pub async fn categories(&self) -> Result<Vec<CategoryCount>, AppError> {
        let catalog = &*self.catalog;
        self.retry
            .run("categories", move || catalog.categories())
            .await
    }

    /// Resumos na ordem dos ids (usado pela lista de favoritos).
    pub async fn summaries_for(&self, ids: &[i64]) -> Result<Vec<BookSummary>, AppError> {
        let catalog = &*self.catalog;
        let records = self
            .retry
            .run("books_by_ids", move || catalog.books_by_ids(ids))
            .await?;
        Ok(records.iter().map(present_summary).collect())
    }

    pub async fn ensure_book_exists(&self, id: i64) -> Result<(), AppError> {
        let catalog = &*self.catalog;
        let exists = self
            .retry
            .run("book_exists", move || catalog.book_exists(id))
            .await?;
        if exists { Ok(()) } else { Err(AppError::BookNotFound(id)) }
    }

    async fn find_record(&self, id: i64) -> Result<BookRecord, AppError> {
        let catalog = &*self.catalog;
        self.retry
            .run("find_book", move || catalog.find_book(id))
            .await?
            .ok_or(AppError::BookNotFound(id))
    }
}
