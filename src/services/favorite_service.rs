// src/services/favorite_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, retry::RetryPolicy},
    db::FavoriteRepository,
    models::favorite::{Favorite, FavoriteBook},
    services::catalog_service::CatalogService,
};

#[derive(Clone)]
pub struct FavoriteService {
    repo: Arc<dyn FavoriteRepository>,
    catalog: CatalogService,
    retry: RetryPolicy,
}

impl FavoriteService {
    pub fn new(repo: Arc<dyn FavoriteRepository>, catalog: CatalogService, retry: RetryPolicy) -> Self {
        Self { repo, catalog, retry }
    }

    pub async fn add(&self, user_id: i64, book_id: i64) -> Result<Favorite, AppError> {
        let repo = &*self.repo;
        let favorite = self
            .retry
            .run("add_favorite", move || repo.upsert(user_id, book_id))
            .await?;
        tracing::debug!(user_id, book_id, "Favorito registrado");
        Ok(favorite)
    }

    pub async fn remove(&self, user_id: i64, book_id: i64) -> Result<(), AppError> {
        let repo = &*self.repo;
        let removed = self
            .retry
            .run("remove_favorite", move || repo.remove(user_id, book_id))
            .await?;
        if removed { Ok(()) } else { Err(AppError::NotAFavorite(book_id)) }
    }

    pub async fn get(&self, user_id: i64, book_id: i64) -> Result<Favorite, AppError> {
        let repo = &*self.repo;
        self.retry
            .run("get_favorite", move || repo.find(user_id, book_id))
            .await?
            .ok_or(AppError::NotAFavorite(book_id))
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<FavoriteBook>, AppError> {
        let repo = &*self.repo;
        let favorites = self
            .retry
            .run("list_favorites", move || repo.list_for_user(user_id))
            .await?;

        let ids: Vec<i64> = favorites.iter().map(|f| f.book_id).collect();
        let summaries = self.catalog.summaries_for(&ids).await?;

        Ok(favorites
            .into_iter()
            .filter_map(|favorite| {
                let book = summaries.iter().find(|b| b.id == favorite.book_id)?.clone();
                Some(FavoriteBook {
                    id: favorite.id,
                    book_id: favorite.book_id,
                    added_at: favorite.added_at,
                    book,
                })
            })
            .collect())
    }
}
