// src/services/notification_service.rs

use std::sync::Arc;

use crate::{
    common::{error::AppError, retry::RetryPolicy},
    db::NotificationRepository,
    models::notification::{NewNotification, Notification},
};

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    retry: RetryPolicy,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, retry: RetryPolicy) -> Self {
        Self { repo, retry }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        let repo = &*self.repo;
        self.retry
            .run("list_notifications", move || repo.list_for_user(user_id))
            .await
    }

    /// Marca como lida (`read = true`) ou volta a não lida.
    pub async fn mark_read(&self, user_id: i64, id: i64, read: bool) -> Result<Notification, AppError> {
        let repo = &*self.repo;
        self.retry
            .run("mark_notification_read", move || repo.set_read(user_id, id, read))
            .await
    }

    /// Sem `ids` marca todas. Ids repetidos contam uma vez só.
    pub async fn mark_many_read(&self, user_id: i64, ids: Option<Vec<i64>>) -> Result<u64, AppError> {
        let ids = ids.map(|mut ids| {
            ids.sort_unstable();
            ids.dedup();
            ids
        });
        let ids = ids.as_deref();
        let repo = &*self.repo;
        self.retry
            .run("mark_notifications_read", move || repo.mark_many_read(user_id, ids))
            .await
    }

    // Notificação é efeito colateral: falha vira aviso no log e não derruba
    // a operação que a originou.
    pub async fn notify(&self, user_id: i64, title: &str, message: String) {
        let created = self
            .repo
            .create(NewNotification {
                user_id,
                title: title.to_string(),
                message,
            })
            .await;

        if let Err(e) = created {
            tracing::warn!(user_id, title, "Falha ao criar notificação: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn service() -> NotificationService {
        NotificationService::new(Arc::new(InMemoryStore::new()), RetryPolicy::default())
    }

    #[tokio::test]
    async fn marking_read_twice_is_idempotent() {
        let svc = service();
        svc.notify(1, "Reserva confirmada", "Tu reserva está lista.".into()).await;
        let id = svc.list(1).await.unwrap()[0].id;

        let first = svc.mark_read(1, id, true).await.unwrap();
        let second = svc.mark_read(1, id, true).await.unwrap();
        assert!(first.read);
        assert!(second.read);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn a_read_notification_can_be_marked_unread_again() {
        let svc = service();
        svc.notify(1, "Libro disponible", "Ya puedes recoger tu libro.".into()).await;
        let id = svc.list(1).await.unwrap()[0].id;

        assert!(svc.mark_read(1, id, true).await.unwrap().read);
        let unread = svc.mark_read(1, id, false).await.unwrap();
        assert!(!unread.read);
        assert!(!svc.list(1).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn other_users_notifications_are_not_found() {
        let svc = service();
        svc.notify(1, "Hola", "mensaje".into()).await;
        let id = svc.list(1).await.unwrap()[0].id;

        let err = svc.mark_read(2, id, true).await.unwrap_err();
        assert!(matches!(err, AppError::NotificationNotFound(n) if n == id));
    }

    #[tokio::test]
    async fn batch_mark_read_is_all_or_nothing() {
        let svc = service();
        svc.notify(1, "A", "a".into()).await;
        svc.notify(1, "B", "b".into()).await;
        svc.notify(2, "C", "c".into()).await;
        let mine: Vec<i64> = svc.list(1).await.unwrap().iter().map(|n| n.id).collect();
        let foreign = svc.list(2).await.unwrap()[0].id;

        let err = svc
            .mark_many_read(1, Some(vec![mine[0], foreign]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotificationNotFound(n) if n == foreign));
        assert!(svc.list(1).await.unwrap().iter().all(|n| !n.read));

        let updated = svc
            .mark_many_read(1, Some(vec![mine[0], mine[1], mine[0]]))
            .await
            .unwrap();
        assert_eq!(updated, 2);
        assert!(svc.list(1).await.unwrap().iter().all(|n| n.read));
        assert!(!svc.list(2).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn batch_without_ids_marks_everything() {
        let svc = service();
        svc.notify(1, "A", "a".into()).await;
        svc.notify(1, "B", "b".into()).await;

        assert_eq!(svc.mark_many_read(1, None).await.unwrap(), 2);
        assert_eq!(svc.mark_many_read(1, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let svc = service();
        svc.notify(1, "Primera", "1".into()).await;
        svc.notify(1, "Segunda", "2".into()).await;
        let titles: Vec<String> = svc.list(1).await.unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, ["Segunda", "Primera"]);
    }
}
