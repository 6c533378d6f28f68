// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::{error::AppError, retry::RetryPolicy},
    db::UserRepository,
    models::auth::{
        AuthResponse, Claims, NewUser, ProfileChanges, RegisterUserPayload, UpdateProfilePayload,
        User,
    },
    services::media::MediaStore,
};

pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
    jwt_secret: String,
    bcrypt_cost: u32,
    retry: RetryPolicy,
    // Upload tem prazo próprio, independente do timeout do banco
    media_retry: RetryPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStore>,
        jwt_secret: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            users,
            media,
            jwt_secret,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            retry,
            media_retry: RetryPolicy::default(),
        }
    }

    pub fn with_media_retry(mut self, policy: RetryPolicy) -> Self {
        self.media_retry = policy;
        self
    }

    /// Custo menor do bcrypt (testes).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub async fn register_user(&self, payload: RegisterUserPayload) -> Result<AuthResponse, AppError> {
        // 1. Hashing fora do runtime assíncrono
        let password = payload.password;
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria o usuário (sempre com o cargo Cliente)
        let user = self
            .users
            .create(NewUser {
                name: payload.name.trim().to_string(),
                last_name: payload.last_name,
                email: payload.email.trim().to_lowercase(),
                password_hash,
                phone: payload.phone,
            })
            .await?;

        tracing::info!(user_id = user.id, "Novo usuário registrado");

        // 3. Gera o token
        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let users = &*self.users;
        let email = email.trim();
        let user = self
            .retry
            .run("find_user_by_email", move || users.find_by_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::debug!(user_id = user.id, "Senha incorreta");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let users = &*self.users;
        let user_id = token_data.claims.sub;
        self.retry
            .run("find_user_by_id", move || users.find_by_id(user_id))
            .await?
            // Token válido de usuário que não existe mais
            .ok_or(AppError::InvalidToken)
    }

    pub async fn profile(&self, user_id: i64) -> Result<User, AppError> {
        let users = &*self.users;
        self.retry
            .run("find_user_by_id", move || users.find_by_id(user_id))
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn update_profile(&self, user_id: i64, payload: UpdateProfilePayload) -> Result<User, AppError> {
        // Foto nova (data URL) vai para o armazenamento externo; senão vale a URL enviada
        let photo_url = match payload.photo.as_deref() {
            Some(data) if data.starts_with("data:image") => {
                let media = &*self.media;
                Some(
                    self.media_retry
                        .run("upload_profile_photo", move || media.upload_profile_photo(user_id, data))
                        .await?,
                )
            }
            _ => payload.photo_url.filter(|url| !url.trim().is_empty()),
        };

        let changes = ProfileChanges {
            name: payload.name.map(|n| n.trim().to_string()),
            last_name: payload.last_name,
            phone: payload.phone,
            address: payload.address,
            gender: payload.gender,
            birth_date: payload.birth_date,
            nationality: payload.nationality,
            bio: payload.bio,
            photo_url,
        };

        let user = self.users.update_profile(user_id, changes).await?;
        tracing::info!(user_id, "Perfil atualizado");
        Ok(user)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user.id,
            name: user.display_name(),
            email: user.email.clone(),
            role: user.role.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        // Usa '?' para um tratamento de erro mais limpo
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
