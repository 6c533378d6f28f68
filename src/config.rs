// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::retry::RetryPolicy,
    db::{InMemoryStore, Repositories},
    services::{
        auth::AuthService,
        catalog_service::CatalogService,
        favorite_service::FavoriteService,
        media::{CloudinaryConfig, CloudinaryStore, DisabledMediaStore, MediaStore},
        notification_service::NotificationService,
        opinion_service::OpinionService,
        reservation_service::ReservationService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_call_timeout: Duration,
    pub use_in_memory_db: bool,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let use_in_memory_db = env::var("USE_IN_MEMORY_DB")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL").ok();
        if database_url.is_none() && !use_in_memory_db {
            anyhow::bail!("DATABASE_URL deve ser definida (ou USE_IN_MEMORY_DB=true)");
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let call_timeout_ms = parse_or("DB_CALL_TIMEOUT_MS", DEFAULT_CALL_TIMEOUT_MS)?;

        // As três variáveis juntas, ou upload desligado
        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                timeout: Duration::from_secs(15),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections,
            db_call_timeout: Duration::from_millis(call_timeout_ms),
            use_in_memory_db,
            cloudinary,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválido: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    // None quando rodando com o store em memória
    pub db_pool: Option<PgPool>,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub reservation_service: ReservationService,
    pub favorite_service: FavoriteService,
    pub opinion_service: OpinionService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let retry = RetryPolicy::default().with_call_timeout(settings.db_call_timeout);

        let (media, media_retry): (Arc<dyn MediaStore>, RetryPolicy) = match &settings.cloudinary {
            Some(config) => (Arc::new(CloudinaryStore::new(config.clone())?), config.retry_policy()),
            None => {
                tracing::warn!("Cloudinary não configurado; upload de fotos desabilitado");
                (Arc::new(DisabledMediaStore), RetryPolicy::default())
            }
        };

        if settings.use_in_memory_db {
            tracing::warn!("USE_IN_MEMORY_DB ativo: os dados não serão persistidos");
            let store = Arc::new(InMemoryStore::with_demo_catalog());
            let mut state = Self::from_repositories(
                Repositories::in_memory(store),
                media,
                settings.jwt_secret.clone(),
                retry,
            );
            state.auth_service = state.auth_service.with_media_retry(media_retry);
            return Ok(state);
        }

        let database_url = settings
            .database_url
            .as_deref()
            .context("DATABASE_URL deve ser definida")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let mut state = Self::from_repositories(
            Repositories::postgres(db_pool.clone()),
            media,
            settings.jwt_secret.clone(),
            retry,
        );
        state.db_pool = Some(db_pool);
        state.auth_service = state.auth_service.with_media_retry(media_retry);
        Ok(state)
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_repositories(
        repos: Repositories,
        media: Arc<dyn MediaStore>,
        jwt_secret: String,
        retry: RetryPolicy,
    ) -> Self {
        let notification_service = NotificationService::new(repos.notifications, retry.clone());
        let catalog_service = CatalogService::new(repos.catalog.clone(), repos.opinions.clone(), retry.clone());

        Self {
            db_pool: None,
            auth_service: AuthService::new(repos.users, media, jwt_secret, retry.clone()),
            favorite_service: FavoriteService::new(repos.favorites, catalog_service.clone(), retry.clone()),
            opinion_service: OpinionService::new(repos.opinions, catalog_service.clone(), retry.clone()),
            reservation_service: ReservationService::new(
                repos.reservations,
                repos.catalog,
                notification_service.clone(),
                retry,
            ),
            catalog_service,
            notification_service,
        }
    }
}
