// src/services/opinion_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, retry::RetryPolicy},
    db::OpinionRepository,
    models::{
        auth::User,
        opinion::{CreateOpinionPayload, OpinionRow, OpinionView},
    },
    services::catalog_service::{present_opinion, CatalogService},
};

#[derive(Clone)]
pub struct OpinionService {
    repo: Arc<dyn OpinionRepository>,
    catalog: CatalogService,
    retry: RetryPolicy,
}

impl OpinionService {
    pub fn new(repo: Arc<dyn OpinionRepository>, catalog: CatalogService, retry: RetryPolicy) -> Self {
        Self { repo, catalog, retry }
    }

    // Payload já validado pelo handler (nota 1..=5, comentário não vazio)
    pub async fn create(&self, author: &User, payload: CreateOpinionPayload) -> Result<OpinionView, AppError> {
        let comment = payload.comment.trim();
        if comment.is_empty() {
            return Err(AppError::BadRequest("El comentario es obligatorio.".to_string()));
        }
        self.catalog.ensure_book_exists(payload.book_id).await?;

        // Sem retentativa: INSERT não é idempotente
        let opinion = self
            .repo
            .create(author.id, payload.book_id, payload.rating, comment)
            .await?;

        tracing::info!(user_id = author.id, book_id = opinion.book_id, "Nova opinião registrada");

        Ok(present_opinion(&OpinionRow {
            opinion,
            reviewer_name: Some(author.name.clone()),
            reviewer_last_name: author.last_name.clone(),
            book_title: None,
        }))
    }

    pub async fn list_mine(&self, user_id: i64) -> Result<Vec<OpinionView>, AppError> {
        let repo = &*self.repo;
        let rows = self
            .retry
            .run("list_my_opinions", move || repo.list_for_user(user_id))
            .await?;
        Ok(rows.iter().map(present_opinion).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, UserRepository};
    use crate::models::auth::NewUser;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn opinions_feed_the_book_rating() {
        let store = Arc::new(InMemoryStore::with_demo_catalog());
        let retry = RetryPolicy::default();
        let catalog = CatalogService::new(store.clone(), store.clone(), retry.clone());
        let svc = OpinionService::new(store.clone(), catalog.clone(), retry);

        let author = UserRepository::create(
            &*store,
            NewUser {
                name: "Lucía".into(),
                last_name: Some("Fernández".into()),
                email: "lucia@biblioverso.com".into(),
                password_hash: "x".into(),
                phone: None,
            },
        )
        .await
        .unwrap();
        let book_id = catalog.featured().await.unwrap()[0].id;

        for rating in [5, 3, 4] {
            let payload = CreateOpinionPayload {
                book_id,
                rating,
                comment: "Muy bueno".into(),
            };
            let view = svc.create(&author, payload).await.unwrap();
            assert_eq!(view.reviewer, "Lucía Fernández");
        }

        let detail = catalog.book_detail(book_id).await.unwrap();
        assert_eq!(detail.rating, Some(Decimal::new(40, 1)));
        assert_eq!(detail.opinions.len(), 3);
        assert_eq!(detail.opinions[0].rating, 4);

        let mine = svc.list_mine(author.id).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|o| o.book_title.is_some()));
    }

    #[tokio::test]
    async fn opinion_on_missing_book_is_not_found() {
        let store = Arc::new(InMemoryStore::with_demo_catalog());
        let retry = RetryPolicy::default();
        let catalog = CatalogService::new(store.clone(), store.clone(), retry.clone());
        let svc = OpinionService::new(store.clone(), catalog, retry);
        let author = UserRepository::create(
            &*store,
            NewUser {
                name: "Ana".into(),
                last_name: None,
                email: "ana@biblioverso.com".into(),
                password_hash: "x".into(),
                phone: None,
            },
        )
        .await
        .unwrap();

        let payload = CreateOpinionPayload { book_id: 999, rating: 4, comment: "Hola".into() };
        assert!(matches!(svc.create(&author, payload).await, Err(AppError::BookNotFound(999))));
    }
}
