// src/services/reservation_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, retry::RetryPolicy},
    db::{CatalogRepository, ReservationRepository},
    models::{
        auth::User,
        reservation::{Reservation, ReservationStatus, ReservationWithBook},
    },
    services::notification_service::NotificationService,
};

#[derive(Clone)]
pub struct ReservationService {
    repo: Arc<dyn ReservationRepository>,
    catalog: Arc<dyn CatalogRepository>,
    notifications: NotificationService,
    retry: RetryPolicy,
}

impl ReservationService {
    pub fn new(
        repo: Arc<dyn ReservationRepository>,
        catalog: Arc<dyn CatalogRepository>,
        notifications: NotificationService,
        retry: RetryPolicy,
    ) -> Self {
        Self { repo, catalog, notifications, retry }
    }

    pub async fn create(&self, user: &User, book_id: i64, quantity: i32) -> Result<Reservation, AppError> {
        let repo = &*self.repo;
        let user_id = user.id;
        let reservation = self
            .retry
            .run_write("create_reservation", move || repo.create(user_id, book_id, quantity))
            .await?;

        tracing::info!(
            reservation_id = reservation.id,
            user_id,
            book_id,
            status = %reservation.status,
            "Reserva criada"
        );

        let title = self.book_title(book_id).await;
        match reservation.status {
            ReservationStatus::Pending => {
                self.notifications
                    .notify(user_id, "Reserva confirmada", format!("Tu reserva de \"{title}\" está pendiente de retiro."))
                    .await
            }
            _ => {
                self.notifications
                    .notify(
                        user_id,
                        "En lista de espera",
                        format!("No hay ejemplares de \"{title}\" disponibles. Te avisaremos cuando haya uno."),
                    )
                    .await
            }
        }

        Ok(reservation)
    }

    pub async fn list_mine(&self, user_id: i64) -> Result<Vec<ReservationWithBook>, AppError> {
        let repo = &*self.repo;
        self.retry
            .run("list_reservations", move || repo.list_for_user(user_id))
            .await
    }

    /// O dono só pode cancelar a própria reserva; o resto exige Administrador.
    pub async fn update_status(
        &self,
        actor: &User,
        id: i64,
        next: ReservationStatus,
    ) -> Result<Reservation, AppError> {
        let repo = &*self.repo;
        let current = self
            .retry
            .run("find_reservation", move || repo.find(id))
            .await?
            .ok_or(AppError::ReservationNotFound(id))?;

        let owner_cancelling = current.user_id == actor.id && next == ReservationStatus::Cancelled;
        if !actor.is_admin() && !owner_cancelling {
            tracing::warn!(actor_id = actor.id, reservation_id = id, to = %next, "Transição de reserva negada");
            return Err(AppError::Forbidden);
        }

        let outcome = self
            .retry
            .run_write("transition_reservation", move || repo.transition(id, next))
            .await?;

        tracing::info!(
            reservation_id = id,
            from = %current.status,
            to = %next,
            promoted = outcome.promoted.len(),
            "Status da reserva atualizado"
        );

        let title = self.book_title(current.book_id).await;
        match next {
            ReservationStatus::Completed => {
                self.notifications
                    .notify(current.user_id, "Reserva completada", format!("Retiraste \"{title}\". ¡Disfruta la lectura!"))
                    .await
            }
            ReservationStatus::Cancelled => {
                self.notifications
                    .notify(current.user_id, "Reserva cancelada", format!("Tu reserva de \"{title}\" fue cancelada."))
                    .await
            }
            ReservationStatus::Pending => {
                self.notifications
                    .notify(current.user_id, "Reserva confirmada", format!("Ya hay un ejemplar de \"{title}\" para ti."))
                    .await
            }
            ReservationStatus::Waiting => {}
        }

        for promoted in &outcome.promoted {
            self.notifications
                .notify(
                    promoted.user_id,
                    "Libro disponible",
                    format!("Un ejemplar de \"{title}\" quedó libre y tu reserva pasó a pendiente."),
                )
                .await;
        }

        Ok(outcome.reservation)
    }

    // Só para o texto das notificações; livro sumido não é erro aqui
    async fn book_title(&self, book_id: i64) -> String {
        match self.catalog.find_book(book_id).await {
            Ok(Some(record)) => record.book.title,
            _ => format!("#{book_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::{memory::BookSeed, InMemoryStore, NotificationRepository, UserRepository};
    use crate::models::{
        auth::{NewUser, ROLE_ADMIN},
        reservation::TransitionOutcome,
        catalog::StockStatus,
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: ReservationService,
        book_id: i64,
    }

    fn fixture(available: usize, checked_out: usize) -> Fixture {
        let store = InMemoryStore::new();
        let category = store.add_category("Historia");
        let book_id = store.add_book(BookSeed {
            title: "Sapiens",
            category_id: Some(category),
            authors: &["Yuval Noah Harari"],
            ..Default::default()
        });
        store.add_copies(book_id, StockStatus::Available, available);
        store.add_copies(book_id, StockStatus::CheckedOut, checked_out);

        let store = Arc::new(store);
        let retry = RetryPolicy::default();
        let notifications = NotificationService::new(store.clone(), retry.clone());
        let service = ReservationService::new(store.clone(), store.clone(), notifications, retry);
        Fixture { store, service, book_id }
    }

    async fn user(store: &InMemoryStore, email: &str) -> User {
        UserRepository::create(
            store,
            NewUser {
                name: "Lector".into(),
                last_name: None,
                email: email.into(),
                password_hash: "x".into(),
                phone: None,
            },
        )
        .await
        .unwrap()
    }

    async fn admin(store: &InMemoryStore) -> User {
        let admin = user(store, "admin@biblioverso.com").await;
        store.set_role(admin.id, ROLE_ADMIN);
        store.find_by_id(admin.id).await.unwrap().unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_claim_the_last_copy_once() {
        let fx = fixture(1, 1);
        let alice = user(&fx.store, "alice@biblioverso.com").await;
        let bruno = user(&fx.store, "bruno@biblioverso.com").await;

        let (a, b) = {
            let (sa, sb) = (fx.service.clone(), fx.service.clone());
            let book_id = fx.book_id;
            let ta = tokio::spawn(async move { sa.create(&alice, book_id, 1).await });
            let tb = tokio::spawn(async move { sb.create(&bruno, book_id, 1).await });
            (ta.await.unwrap().unwrap(), tb.await.unwrap().unwrap())
        };

        let mut statuses = [a.status, b.status];
        statuses.sort_by_key(|s| s.as_str());
        assert_eq!(statuses, [ReservationStatus::Waiting, ReservationStatus::Pending]);
        assert_eq!(
            fx.store.stock_of(fx.book_id),
            vec![StockStatus::Reserved, StockStatus::CheckedOut]
        );
    }

    // Falha as primeiras `failures` chamadas. Com `commit_first` a reserva é
    // gravada e só a resposta se perde, como uma conexão caindo após o COMMIT.
    struct FlakyRepo {
        store: Arc<InMemoryStore>,
        failures: AtomicUsize,
        commit_first: bool,
        error: fn() -> AppError,
    }

    #[async_trait]
    impl ReservationRepository for FlakyRepo {
        async fn create(&self, user_id: i64, book_id: i64, quantity: i32) -> Result<Reservation, AppError> {
            let fail = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail && !self.commit_first {
                return Err((self.error)());
            }
            let created = ReservationRepository::create(&*self.store, user_id, book_id, quantity).await?;
            if fail {
                return Err((self.error)());
            }
            Ok(created)
        }

        async fn find(&self, id: i64) -> Result<Option<Reservation>, AppError> {
            ReservationRepository::find(&*self.store, id).await
        }

        async fn list_for_user(&self, user_id: i64) -> Result<Vec<ReservationWithBook>, AppError> {
            ReservationRepository::list_for_user(&*self.store, user_id).await
        }

        async fn transition(&self, id: i64, next: ReservationStatus) -> Result<TransitionOutcome, AppError> {
            self.store.transition(id, next).await
        }
    }

    fn service_over(store: &Arc<InMemoryStore>, repo: FlakyRepo) -> ReservationService {
        let retry = RetryPolicy {
            initial_delay: std::time::Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let notifications = NotificationService::new(store.clone(), retry.clone());
        ReservationService::new(Arc::new(repo), store.clone(), notifications, retry)
    }

    #[tokio::test]
    async fn lost_commit_acknowledgement_does_not_book_twice() {
        let fx = fixture(2, 0);
        let reader = user(&fx.store, "lector@biblioverso.com").await;
        let service = service_over(
            &fx.store,
            FlakyRepo {
                store: fx.store.clone(),
                failures: AtomicUsize::new(1),
                commit_first: true,
                error: || {
                    AppError::DatabaseError(sqlx::Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "reset",
                    )))
                },
            },
        );

        let err = service.create(&reader, fx.book_id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(sqlx::Error::Io(_))));

        let mine = ReservationRepository::list_for_user(&*fx.store, reader.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(
            fx.store.stock_of(fx.book_id),
            vec![StockStatus::Reserved, StockStatus::Available]
        );
    }

    #[tokio::test]
    async fn failures_before_the_transaction_are_retried() {
        let fx = fixture(2, 0);
        let reader = user(&fx.store, "lector@biblioverso.com").await;
        let service = service_over(
            &fx.store,
            FlakyRepo {
                store: fx.store.clone(),
                failures: AtomicUsize::new(2),
                commit_first: false,
                error: || AppError::DatabaseError(sqlx::Error::PoolTimedOut),
            },
        );

        let reservation = service.create(&reader, fx.book_id, 1).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);

        let mine = ReservationRepository::list_for_user(&*fx.store, reader.id).await.unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn no_available_copies_means_waitlist() {
        let fx = fixture(0, 2);
        for email in ["a@b.com", "c@d.com", "e@f.com"] {
            let reader = user(&fx.store, email).await;
            let reservation = fx.service.create(&reader, fx.book_id, 1).await.unwrap();
            assert_eq!(reservation.status, ReservationStatus::Waiting);
        }
    }

    #[tokio::test]
    async fn partial_claims_are_released() {
        let fx = fixture(1, 0);
        let reader = user(&fx.store, "lector@biblioverso.com").await;

        let reservation = fx.service.create(&reader, fx.book_id, 2).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Waiting);
        assert_eq!(fx.store.stock_of(fx.book_id), vec![StockStatus::Available]);
    }

    #[tokio::test]
    async fn reserving_a_missing_book_is_not_found() {
        let fx = fixture(1, 0);
        let reader = user(&fx.store, "lector@biblioverso.com").await;
        let err = fx.service.create(&reader, 9999, 1).await.unwrap_err();
        assert!(matches!(err, AppError::BookNotFound(9999)));
    }

    #[tokio::test]
    async fn cancelling_promotes_the_oldest_waiting_reservation() {
        let fx = fixture(1, 0);
        let first = user(&fx.store, "first@biblioverso.com").await;
        let second = user(&fx.store, "second@biblioverso.com").await;
        let third = user(&fx.store, "third@biblioverso.com").await;

        let holding = fx.service.create(&first, fx.book_id, 1).await.unwrap();
        let waiting_a = fx.service.create(&second, fx.book_id, 1).await.unwrap();
        let waiting_b = fx.service.create(&third, fx.book_id, 1).await.unwrap();
        assert_eq!(holding.status, ReservationStatus::Pending);

        let cancelled = fx
            .service
            .update_status(&first, holding.id, ReservationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        let promoted = ReservationRepository::find(&*fx.store, waiting_a.id).await.unwrap().unwrap();
        let still_waiting = ReservationRepository::find(&*fx.store, waiting_b.id).await.unwrap().unwrap();
        assert_eq!(promoted.status, ReservationStatus::Pending);
        assert_eq!(still_waiting.status, ReservationStatus::Waiting);
        assert_eq!(fx.store.stock_of(fx.book_id), vec![StockStatus::Reserved]);

        let inbox = NotificationRepository::list_for_user(&*fx.store, second.id).await.unwrap();
        assert!(inbox.iter().any(|n| n.title == "Libro disponible"));
    }

    #[tokio::test]
    async fn terminal_states_reject_transitions() {
        let fx = fixture(1, 0);
        let admin = admin(&fx.store).await;
        let reader = user(&fx.store, "lector@biblioverso.com").await;
        let reservation = fx.service.create(&reader, fx.book_id, 1).await.unwrap();

        fx.service
            .update_status(&admin, reservation.id, ReservationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(fx.store.stock_of(fx.book_id), vec![StockStatus::CheckedOut]);

        let err = fx
            .service
            .update_status(&admin, reservation.id, ReservationStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::IllegalTransition {
                from: ReservationStatus::Completed,
                to: ReservationStatus::Pending
            }
        ));
    }

    #[tokio::test]
    async fn waiting_to_pending_requires_a_free_copy() {
        let fx = fixture(0, 1);
        let admin = admin(&fx.store).await;
        let reader = user(&fx.store, "lector@biblioverso.com").await;
        let reservation = fx.service.create(&reader, fx.book_id, 1).await.unwrap();

        let err = fx
            .service
            .update_status(&admin, reservation.id, ReservationStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoCopyAvailable(_)));

        fx.store.add_copies(fx.book_id, StockStatus::Available, 1);
        let promoted = fx
            .service
            .update_status(&admin, reservation.id, ReservationStatus::Pending)
            .await
            .unwrap();
        assert_eq!(promoted.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn only_owner_cancel_is_allowed_without_admin_role() {
        let fx = fixture(1, 0);
        let owner = user(&fx.store, "owner@biblioverso.com").await;
        let stranger = user(&fx.store, "stranger@biblioverso.com").await;
        let reservation = fx.service.create(&owner, fx.book_id, 1).await.unwrap();

        let err = fx
            .service
            .update_status(&stranger, reservation.id, ReservationStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = fx
            .service
            .update_status(&owner, reservation.id, ReservationStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = fx
            .service
            .update_status(&owner, 424242, ReservationStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReservationNotFound(424242)));
    }
}
