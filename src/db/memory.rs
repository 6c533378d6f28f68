// src/db/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

use crate::{
    common::error::AppError,
    db::{
        CatalogRepository, FavoriteRepository, NotificationRepository, OpinionRepository,
        ReservationRepository, UserRepository,
    },
    models::{
        auth::{NewUser, ProfileChanges, User, ROLE_CLIENT},
        catalog::{Book, BookFilter, BookRecord, CategoryCount, StockStatus},
        favorite::Favorite,
        notification::{NewNotification, Notification},
        opinion::{Opinion, OpinionRow},
        reservation::{Reservation, ReservationStatus, ReservationWithBook, TransitionOutcome},
    },
};

// Armazenamento em memória com as mesmas garantias do Postgres: toda
// escrita que mexe em estoque acontece sob um único write lock.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<User>,
    categories: Vec<(i64, String)>,
    books: Vec<Book>,
    book_authors: HashMap<i64, Vec<String>>,
    stock: Vec<StockCopy>,
    reservations: Vec<Reservation>,
    favorites: Vec<Favorite>,
    opinions: Vec<Opinion>,
    notifications: Vec<Notification>,
}

#[derive(Debug, Clone)]
struct StockCopy {
    id: i64,
    book_id: i64,
    status: StockStatus,
    reservation_id: Option<i64>,
}

// Dados de um livro para popular o armazenamento
#[derive(Debug, Clone, Default)]
pub struct BookSeed<'a> {
    pub title: &'a str,
    pub synopsis: Option<&'a str>,
    pub publisher: Option<&'a str>,
    pub publication_date: Option<NaiveDate>,
    pub cover_url: Option<&'a str>,
    pub category_id: Option<i64>,
    pub authors: &'a [&'a str],
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn category_name(&self, id: Option<i64>) -> Option<String> {
        id.and_then(|id| self.categories.iter().find(|(cid, _)| *cid == id))
            .map(|(_, name)| name.clone())
    }

    fn live_book(&self, id: i64) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id && !b.deleted)
    }

    fn record(&self, book: &Book) -> BookRecord {
        let mut book = book.clone();
        book.category_name = self.category_name(book.category_id);
        BookRecord {
            authors: self.book_authors.get(&book.id).cloned().unwrap_or_default(),
            stock: self
                .stock
                .iter()
                .filter(|c| c.book_id == book.id)
                .map(|c| c.status)
                .collect(),
            ratings: self
                .opinions
                .iter()
                .filter(|o| o.book_id == book.id)
                .map(|o| o.rating)
                .collect(),
            book,
        }
    }

    fn claim_copies(&mut self, book_id: i64, quantity: i32) -> Vec<i64> {
        let mut claimed = Vec::new();
        for copy in self.stock.iter_mut() {
            if claimed.len() == quantity as usize {
                break;
            }
            if copy.book_id == book_id && copy.status.is_available() {
                copy.status = StockStatus::Reserved;
                claimed.push(copy.id);
            }
        }
        claimed
    }

    fn release_copies(&mut self, copy_ids: &[i64]) {
        for copy in self.stock.iter_mut().filter(|c| copy_ids.contains(&c.id)) {
            copy.status = StockStatus::Available;
            copy.reservation_id = None;
        }
    }

    fn attach_copies(&mut self, copy_ids: &[i64], reservation_id: i64) {
        for copy in self.stock.iter_mut().filter(|c| copy_ids.contains(&c.id)) {
            copy.reservation_id = Some(reservation_id);
        }
    }

    fn set_status(&mut self, id: i64, next: ReservationStatus) -> Option<Reservation> {
        let reservation = self.reservations.iter_mut().find(|r| r.id == id)?;
        reservation.status = next;
        reservation.updated_at = Utc::now();
        Some(reservation.clone())
    }

    fn promote_waitlist(&mut self, book_id: i64) -> Vec<Reservation> {
        let mut waiting: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.book_id == book_id && r.status == ReservationStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|r| (r.created_at, r.id));

        let mut promoted = Vec::new();
        for candidate in waiting {
            let claimed = self.claim_copies(book_id, candidate.quantity);
            if claimed.len() < candidate.quantity as usize {
                self.release_copies(&claimed);
                break;
            }
            self.attach_copies(&claimed, candidate.id);
            if let Some(reservation) = self.set_status(candidate.id, ReservationStatus::Pending) {
                promoted.push(reservation);
            }
        }
        promoted
    }

    fn opinion_row(&self, opinion: &Opinion) -> OpinionRow {
        let reviewer = self.users.iter().find(|u| u.id == opinion.user_id);
        OpinionRow {
            opinion: opinion.clone(),
            reviewer_name: reviewer.map(|u| u.name.clone()),
            reviewer_last_name: reviewer.and_then(|u| u.last_name.clone()),
            book_title: self
                .books
                .iter()
                .find(|b| b.id == opinion.book_id)
                .map(|b| b.title.clone()),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, name: &str) -> i64 {
        let mut state = self.state.write();
        let id = state.next_id();
        state.categories.push((id, name.to_string()));
        id
    }

    pub fn add_book(&self, seed: BookSeed<'_>) -> i64 {
        let mut state = self.state.write();
        let id = state.next_id();
        state.books.push(Book {
            id,
            title: seed.title.to_string(),
            synopsis: seed.synopsis.map(str::to_string),
            publisher: seed.publisher.map(str::to_string),
            publication_date: seed.publication_date,
            cover_url: seed.cover_url.map(str::to_string),
            deleted: false,
            category_id: seed.category_id,
            category_name: None,
            created_at: Utc::now(),
        });
        state
            .book_authors
            .insert(id, seed.authors.iter().map(|a| a.to_string()).collect());
        id
    }

    pub fn add_copies(&self, book_id: i64, status: StockStatus, count: usize) {
        let mut state = self.state.write();
        for _ in 0..count {
            let id = state.next_id();
            state.stock.push(StockCopy { id, book_id, status, reservation_id: None });
        }
    }

    #[cfg(test)]
    pub fn delete_book(&self, book_id: i64) {
        let mut state = self.state.write();
        if let Some(book) = state.books.iter_mut().find(|b| b.id == book_id) {
            book.deleted = true;
        }
    }

    #[cfg(test)]
    pub fn set_role(&self, user_id: i64, role: &str) {
        let mut state = self.state.write();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.role = role.to_string();
        }
    }

    #[cfg(test)]
    pub fn stock_of(&self, book_id: i64) -> Vec<StockStatus> {
        self.state
            .read()
            .stock
            .iter()
            .filter(|c| c.book_id == book_id)
            .map(|c| c.status)
            .collect()
    }

    /// Mesmo catálogo inicial das migrações, para rodar sem Postgres.
    pub fn with_demo_catalog() -> Self {
        let store = Self::new();
        let fiction = store.add_category("Ficción");
        let history = store.add_category("Historia");
        let science = store.add_category("Ciencia");

        let solitude = store.add_book(BookSeed {
            title: "Cien años de soledad",
            synopsis: Some("La saga de la familia Buendía en Macondo."),
            publisher: Some("Sudamericana"),
            publication_date: NaiveDate::from_ymd_opt(1967, 5, 30),
            category_id: Some(fiction),
            authors: &["Gabriel García Márquez"],
            ..Default::default()
        });
        let sapiens = store.add_book(BookSeed {
            title: "Sapiens",
            synopsis: Some("Una breve historia de la humanidad."),
            publisher: Some("Debate"),
            publication_date: NaiveDate::from_ymd_opt(2011, 1, 1),
            category_id: Some(history),
            authors: &["Yuval Noah Harari"],
            ..Default::default()
        });
        let cosmos = store.add_book(BookSeed {
            title: "Cosmos",
            synopsis: Some("Un recorrido por la evolución del universo y de la ciencia."),
            publisher: Some("Planeta"),
            publication_date: NaiveDate::from_ymd_opt(1980, 1, 1),
            category_id: Some(science),
            authors: &["Carl Sagan"],
            ..Default::default()
        });

        store.add_copies(solitude, StockStatus::Available, 2);
        store.add_copies(sapiens, StockStatus::Available, 1);
        store.add_copies(sapiens, StockStatus::CheckedOut, 1);
        store.add_copies(cosmos, StockStatus::Lost, 1);
        store
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read();
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.state.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.write();
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::EmailAlreadyExists);
        }
        let id = state.next_id();
        let created = User {
            id,
            name: user.name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            address: None,
            gender: None,
            birth_date: None,
            nationality: None,
            bio: None,
            photo_url: None,
            role: ROLE_CLIENT.to_string(),
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User, AppError> {
        let mut state = self.state.write();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::UserNotFound)?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if changes.last_name.is_some() {
            user.last_name = changes.last_name;
        }
        if changes.phone.is_some() {
            user.phone = changes.phone;
        }
        if changes.address.is_some() {
            user.address = changes.address;
        }
        if changes.gender.is_some() {
            user.gender = changes.gender;
        }
        if changes.birth_date.is_some() {
            user.birth_date = changes.birth_date;
        }
        if changes.nationality.is_some() {
            user.nationality = changes.nationality;
        }
        if changes.bio.is_some() {
            user.bio = changes.bio;
        }
        if changes.photo_url.is_some() {
            user.photo_url = changes.photo_url;
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<BookRecord>, AppError> {
        let state = self.state.read();
        let text = filter.text.as_deref().map(str::to_lowercase);
        let category = filter.category.as_deref().map(str::to_lowercase);

        let contains = |field: &Option<String>, needle: &str| {
            field.as_deref().is_some_and(|v| v.to_lowercase().contains(needle))
        };

        let mut records: Vec<BookRecord> = state
            .books
            .iter()
            .filter(|b| !b.deleted)
            .map(|b| state.record(b))
            .filter(|r| match &text {
                Some(needle) => {
                    r.book.title.to_lowercase().contains(needle.as_str())
                        || contains(&r.book.synopsis, needle)
                        || contains(&r.book.publisher, needle)
                }
                None => true,
            })
            .filter(|r| match &category {
                Some(wanted) => r
                    .book
                    .category_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase() == *wanted),
                None => true,
            })
            .collect();
        records.sort_by_key(|r| r.book.id);
        Ok(records)
    }

    async fn latest_books(&self, limit: i64) -> Result<Vec<BookRecord>, AppError> {
        let state = self.state.read();
        let mut books: Vec<&Book> = state.books.iter().filter(|b| !b.deleted).collect();
        books.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(books
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|b| state.record(b))
            .collect())
    }

    async fn find_book(&self, id: i64) -> Result<Option<BookRecord>, AppError> {
        let state = self.state.read();
        Ok(state.live_book(id).map(|b| state.record(b)))
    }

    async fn books_by_ids(&self, ids: &[i64]) -> Result<Vec<BookRecord>, AppError> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.live_book(*id))
            .map(|b| state.record(b))
            .collect())
    }

    async fn book_exists(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state.read().live_book(id).is_some())
    }

    async fn categories(&self) -> Result<Vec<CategoryCount>, AppError> {
        let state = self.state.read();
        let mut categories: Vec<CategoryCount> = state
            .categories
            .iter()
            .map(|(id, name)| CategoryCount {
                id: *id,
                name: name.clone(),
                count: state
                    .books
                    .iter()
                    .filter(|b| !b.deleted && b.category_id == Some(*id))
                    .count() as i64,
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn create(&self, user_id: i64, book_id: i64, quantity: i32) -> Result<Reservation, AppError> {
        let mut state = self.state.write();
        if state.live_book(book_id).is_none() {
            return Err(AppError::BookNotFound(book_id));
        }

        let claimed = state.claim_copies(book_id, quantity);
        let status = if claimed.len() == quantity as usize {
            ReservationStatus::Pending
        } else {
            state.release_copies(&claimed);
            ReservationStatus::Waiting
        };

        let id = state.next_id();
        let now = Utc::now();
        let reservation = Reservation {
            id,
            user_id,
            book_id,
            status,
            quantity,
            created_at: now,
            updated_at: now,
        };
        state.reservations.push(reservation.clone());
        if status == ReservationStatus::Pending {
            state.attach_copies(&claimed, id);
        }
        Ok(reservation)
    }

    async fn find(&self, id: i64) -> Result<Option<Reservation>, AppError> {
        Ok(self.state.read().reservations.iter().find(|r| r.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ReservationWithBook>, AppError> {
        let state = self.state.read();
        let mut reservations: Vec<ReservationWithBook> = state
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let book = state.books.iter().find(|b| b.id == r.book_id)?;
                Some(ReservationWithBook {
                    reservation: r.clone(),
                    book_title: book.title.clone(),
                    cover_url: book.cover_url.clone(),
                })
            })
            .collect();
        reservations.sort_by(|a, b| {
            (b.reservation.created_at, b.reservation.id).cmp(&(a.reservation.created_at, a.reservation.id))
        });
        Ok(reservations)
    }

    async fn transition(&self, id: i64, next: ReservationStatus) -> Result<TransitionOutcome, AppError> {
        let mut state = self.state.write();
        let current = state
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(AppError::ReservationNotFound(id))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::IllegalTransition { from: current.status, to: next });
        }

        match (current.status, next) {
            (ReservationStatus::Waiting, ReservationStatus::Pending) => {
                let claimed = state.claim_copies(current.book_id, current.quantity);
                if claimed.len() < current.quantity as usize {
                    state.release_copies(&claimed);
                    return Err(AppError::NoCopyAvailable(current.book_id));
                }
                state.attach_copies(&claimed, id);
            }
            (ReservationStatus::Pending, ReservationStatus::Completed) => {
                for copy in state.stock.iter_mut().filter(|c| c.reservation_id == Some(id)) {
                    copy.status = StockStatus::CheckedOut;
                }
            }
            (ReservationStatus::Pending, ReservationStatus::Cancelled) => {
                let held: Vec<i64> = state
                    .stock
                    .iter()
                    .filter(|c| c.reservation_id == Some(id) && c.status == StockStatus::Reserved)
                    .map(|c| c.id)
                    .collect();
                state.release_copies(&held);
            }
            _ => {}
        }

        let reservation = state
            .set_status(id, next)
            .ok_or(AppError::ReservationNotFound(id))?;

        let promoted = if current.status == ReservationStatus::Pending && next == ReservationStatus::Cancelled {
            state.promote_waitlist(current.book_id)
        } else {
            Vec::new()
        };

        Ok(TransitionOutcome { reservation, promoted })
    }
}

#[async_trait]
impl FavoriteRepository for InMemoryStore {
    async fn upsert(&self, user_id: i64, book_id: i64) -> Result<Favorite, AppError> {
        let mut state = self.state.write();
        if state.live_book(book_id).is_none() {
            return Err(AppError::BookNotFound(book_id));
        }
        if let Some(existing) = state
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.book_id == book_id)
        {
            return Ok(existing.clone());
        }
        let favorite = Favorite {
            id: state.next_id(),
            user_id,
            book_id,
            added_at: Utc::now(),
        };
        state.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn remove(&self, user_id: i64, book_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write();
        let before = state.favorites.len();
        state
            .favorites
            .retain(|f| !(f.user_id == user_id && f.book_id == book_id));
        Ok(state.favorites.len() < before)
    }

    async fn find(&self, user_id: i64, book_id: i64) -> Result<Option<Favorite>, AppError> {
        Ok(self
            .state
            .read()
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.book_id == book_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Favorite>, AppError> {
        let state = self.state.read();
        let mut favorites: Vec<Favorite> = state
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id && state.live_book(f.book_id).is_some())
            .cloned()
            .collect();
        favorites.sort_by(|a, b| (b.added_at, b.id).cmp(&(a.added_at, a.id)));
        Ok(favorites)
    }
}

#[async_trait]
impl OpinionRepository for InMemoryStore {
    async fn create(
        &self,
        user_id: i64,
        book_id: i64,
        rating: i16,
        comment: &str,
    ) -> Result<Opinion, AppError> {
        let mut state = self.state.write();
        if !state.books.iter().any(|b| b.id == book_id) {
            return Err(AppError::BookNotFound(book_id));
        }
        let opinion = Opinion {
            id: state.next_id(),
            user_id,
            book_id,
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };
        state.opinions.push(opinion.clone());
        Ok(opinion)
    }

    async fn list_for_book(&self, book_id: i64) -> Result<Vec<OpinionRow>, AppError> {
        let state = self.state.read();
        let mut rows: Vec<OpinionRow> = state
            .opinions
            .iter()
            .filter(|o| o.book_id == book_id)
            .map(|o| state.opinion_row(o))
            .collect();
        rows.sort_by(|a, b| (b.opinion.created_at, b.opinion.id).cmp(&(a.opinion.created_at, a.opinion.id)));
        Ok(rows)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<OpinionRow>, AppError> {
        let state = self.state.read();
        let mut rows: Vec<OpinionRow> = state
            .opinions
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|o| state.opinion_row(o))
            .collect();
        rows.sort_by(|a, b| (b.opinion.created_at, b.opinion.id).cmp(&(a.opinion.created_at, a.opinion.id)));
        Ok(rows)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, notification: NewNotification) -> Result<Notification, AppError> {
        let mut state = self.state.write();
        let created = Notification {
            id: state.next_id(),
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            created_at: Utc::now(),
            read: false,
        };
        state.notifications.push(created.clone());
        Ok(created)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>, AppError> {
        let state = self.state.read();
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(notifications)
    }

    async fn set_read(&self, user_id: i64, id: i64, read: bool) -> Result<Notification, AppError> {
        let mut state = self.state.write();
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(AppError::NotificationNotFound(id))?;
        notification.read = read;
        Ok(notification.clone())
    }

    async fn mark_many_read(&self, user_id: i64, ids: Option<&[i64]>) -> Result<u64, AppError> {
        let mut state = self.state.write();

        if let Some(ids) = ids {
            let owned = |id: &i64| {
                state
                    .notifications
                    .iter()
                    .any(|n| n.id == *id && n.user_id == user_id)
            };
            if let Some(missing) = ids.iter().find(|id| !owned(id)) {
                return Err(AppError::NotificationNotFound(*missing));
            }
        }

        let mut updated = 0;
        for notification in state.notifications.iter_mut().filter(|n| {
            n.user_id == user_id && !n.read && ids.is_none_or(|ids| ids.contains(&n.id))
        }) {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::ROLE_ADMIN;

    fn sample_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".into(),
            last_name: None,
            email: email.into(),
            password_hash: "hash".into(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = InMemoryStore::new();
        UserRepository::create(&store, sample_user("ana@biblioverso.com")).await.unwrap();
        let err = UserRepository::create(&store, sample_user("ANA@biblioverso.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailAlreadyExists));
    }

    #[tokio::test]
    async fn admin_role_can_be_assigned() {
        let store = InMemoryStore::new();
        let user = UserRepository::create(&store, sample_user("admin@biblioverso.com")).await.unwrap();
        store.set_role(user.id, ROLE_ADMIN);
        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(found.is_admin());
    }

    #[tokio::test]
    async fn demo_catalog_matches_seed_data() {
        let store = InMemoryStore::with_demo_catalog();
        let categories = store.categories().await.unwrap();
        assert_eq!(categories.len(), 3);
        assert!(categories.iter().all(|c| c.count == 1));

        let sapiens = store
            .list_books(&BookFilter { text: Some("sapiens".into()), category: None })
            .await
            .unwrap();
        assert_eq!(sapiens.len(), 1);
        assert_eq!(sapiens[0].stock.len(), 2);
    }

    #[tokio::test]
    async fn deleted_books_disappear_from_reads() {
        let store = InMemoryStore::with_demo_catalog();
        let all = store.list_books(&BookFilter::default()).await.unwrap();
        let cosmos = all.iter().find(|r| r.book.title == "Cosmos").unwrap().book.id;

        store.delete_book(cosmos);

        assert!(store.find_book(cosmos).await.unwrap().is_none());
        assert!(!store.book_exists(cosmos).await.unwrap());
        assert_eq!(store.list_books(&BookFilter::default()).await.unwrap().len(), 2);
    }
}
