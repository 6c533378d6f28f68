// src/db/catalog_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::like_pattern,
    models::catalog::{Book, BookFilter, BookRecord, CategoryCount, StockStatus},
};

// Leitura do catálogo. Livros com `deleted = true` nunca aparecem.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<BookRecord>, AppError>;
    async fn latest_books(&self, limit: i64) -> Result<Vec<BookRecord>, AppError>;
    async fn find_book(&self, id: i64) -> Result<Option<BookRecord>, AppError>;
    /// Registros na mesma ordem dos ids pedidos (ids inexistentes são ignorados).
    async fn books_by_ids(&self, ids: &[i64]) -> Result<Vec<BookRecord>, AppError>;
    async fn book_exists(&self, id: i64) -> Result<bool, AppError>;
    async fn categories(&self) -> Result<Vec<CategoryCount>, AppError>;
}

const SELECT_BOOK: &str = r#"
    SELECT
        b.id, b.title, b.synopsis, b.publisher, b.publication_date, b.cover_url,
        b.deleted, b.category_id, c.name AS category_name, b.created_at
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Carrega autores, exemplares e notas de todos os livros de uma vez
    // (três consultas com ANY, em vez de três por livro).
    async fn hydrate(&self, books: Vec<Book>) -> Result<Vec<BookRecord>, AppError> {
        if books.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();

        let authors: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT ba.book_id, a.name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY ba.book_id, a.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let stock: Vec<(i64, StockStatus)> =
            sqlx::query_as("SELECT book_id, status FROM stock WHERE book_id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?;

        let ratings: Vec<(i64, i16)> =
            sqlx::query_as("SELECT book_id, rating FROM opinions WHERE book_id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?;

        let mut by_book: HashMap<i64, BookRecord> = books
            .iter()
            .map(|book| {
                (
                    book.id,
                    BookRecord {
                        book: book.clone(),
                        authors: Vec::new(),
                        stock: Vec::new(),
                        ratings: Vec::new(),
                    },
                )
            })
            .collect();

        for (book_id, name) in authors {
            if let Some(record) = by_book.get_mut(&book_id) {
                record.authors.push(name);
            }
        }
        for (book_id, status) in stock {
            if let Some(record) = by_book.get_mut(&book_id) {
                record.stock.push(status);
            }
        }
        for (book_id, rating) in ratings {
            if let Some(record) = by_book.get_mut(&book_id) {
                record.ratings.push(rating);
            }
        }

        // Mantém a ordem original da consulta
        Ok(ids.iter().filter_map(|id| by_book.remove(id)).collect())
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<BookRecord>, AppError> {
        let text = filter.text.as_deref().map(like_pattern);
        let sql = format!(
            r#"{SELECT_BOOK}
            WHERE b.deleted = FALSE
              AND ($1::text IS NULL
                   OR b.title ILIKE $1
                   OR b.synopsis ILIKE $1
                   OR b.publisher ILIKE $1)
              AND ($2::text IS NULL OR LOWER(c.name) = LOWER($2))
            ORDER BY b.id
            "#
        );
        let books = sqlx::query_as::<_, Book>(&sql)
            .bind(text)
            .bind(&filter.category)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(books).await
    }

    async fn latest_books(&self, limit: i64) -> Result<Vec<BookRecord>, AppError> {
        let sql = format!(
            "{SELECT_BOOK} WHERE b.deleted = FALSE ORDER BY b.created_at DESC, b.id DESC LIMIT $1"
        );
        let books = sqlx::query_as::<_, Book>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(books).await
    }

    async fn find_book(&self, id: i64) -> Result<Option<BookRecord>, AppError> {
        let sql = format!("{SELECT_BOOK} WHERE b.id = $1 AND b.deleted = FALSE");
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match book {
            Some(book) => Ok(self.hydrate(vec![book]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn books_by_ids(&self, ids: &[i64]) -> Result<Vec<BookRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{SELECT_BOOK} WHERE b.id = ANY($1) AND b.deleted = FALSE");
        let mut books = sqlx::query_as::<_, Book>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        books.sort_by_key(|b| ids.iter().position(|id| *id == b.id));
        self.hydrate(books).await
    }

    async fn book_exists(&self, id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM books WHERE id = $1 AND deleted = FALSE)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn categories(&self) -> Result<Vec<CategoryCount>, AppError> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT c.id, c.name, COUNT(b.id) AS count
            FROM categories c
            LEFT JOIN books b ON b.category_id = c.id AND b.deleted = FALSE
            GROUP BY c.id, c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}
