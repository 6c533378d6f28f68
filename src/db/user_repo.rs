// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::auth::{NewUser, ProfileChanges, User, CLIENT_ROLE_ID},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    /// Falha com `EmailAlreadyExists` se o e-mail já estiver em uso.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User, AppError>;
}

const SELECT_USER: &str = r#"
    SELECT
        u.id, u.name, u.last_name, u.email, u.password_hash,
        u.phone, u.address, u.gender, u.birth_date, u.nationality, u.bio, u.photo_url,
        r.name AS role,
        u.created_at
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("{SELECT_USER} WHERE LOWER(u.email) = LOWER($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("{SELECT_USER} WHERE u.id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, last_name, email, password_hash, phone, role_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(CLIENT_ROLE_ID)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // O nome padrão que o Postgres cria para "UNIQUE" na coluna email
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })?;

        self.find_by_id(id).await?.ok_or(AppError::UserNotFound)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User, AppError> {
        // COALESCE: campo ausente mantém o valor atual
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                name        = COALESCE($2, name),
                last_name   = COALESCE($3, last_name),
                phone       = COALESCE($4, phone),
                address     = COALESCE($5, address),
                gender      = COALESCE($6, gender),
                birth_date  = COALESCE($7, birth_date),
                nationality = COALESCE($8, nationality),
                bio         = COALESCE($9, bio),
                photo_url   = COALESCE($10, photo_url)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.last_name)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.gender)
        .bind(changes.birth_date)
        .bind(&changes.nationality)
        .bind(&changes.bio)
        .bind(&changes.photo_url)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }

        self.find_by_id(id).await?.ok_or(AppError::UserNotFound)
    }
}
