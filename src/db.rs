use std::sync::Arc;

use sqlx::PgPool;

pub mod catalog_repo;
pub use catalog_repo::{CatalogRepository, PgCatalogRepository};
pub mod favorite_repo;
pub use favorite_repo::{FavoriteRepository, PgFavoriteRepository};
pub mod memory;
pub use memory::InMemoryStore;
pub mod notification_repo;
pub use notification_repo::{NotificationRepository, PgNotificationRepository};
pub mod opinion_repo;
pub use opinion_repo::{OpinionRepository, PgOpinionRepository};
pub mod reservation_repo;
pub use reservation_repo::{PgReservationRepository, ReservationRepository};
pub mod user_repo;
pub use user_repo::{PgUserRepository, UserRepository};

// Conjunto de repositórios injetado nos serviços. Postgres em produção,
// memória para testes e para rodar sem banco (USE_IN_MEMORY_DB).
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub opinions: Arc<dyn OpinionRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            catalog: Arc::new(PgCatalogRepository::new(pool.clone())),
            reservations: Arc::new(PgReservationRepository::new(pool.clone())),
            favorites: Arc::new(PgFavoriteRepository::new(pool.clone())),
            opinions: Arc::new(PgOpinionRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            reservations: store.clone(),
            favorites: store.clone(),
            opinions: store.clone(),
            notifications: store,
        }
    }
}

/// Escapa curingas do LIKE para buscar o texto literalmente.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
