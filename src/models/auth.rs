// src/models/auth.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub const ROLE_ADMIN: &str = "Administrador";
pub const ROLE_CLIENT: &str = "Cliente";
pub const CLIENT_ROLE_ID: i64 = 2;

// Representa um usuário vindo do banco de dados (já com o nome do cargo)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 7)]
    pub id: i64,
    #[schema(example = "Lucía")]
    pub name: String,
    pub last_name: Option<String>,
    #[schema(example = "lucia@biblioverso.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    #[schema(example = "Cliente")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.name, last),
            _ => self.name.clone(),
        }
    }
}

// Dados já validados e com a senha em hash, prontos para o repositório
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
}

// Alterações de perfil (None = mantém o valor atual)
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    #[schema(example = "Lucía")]
    pub name: String,
    #[schema(example = "Fernández")]
    pub last_name: Option<String>,
    #[validate(email(message = "El correo no es válido."))]
    #[schema(example = "lucia@biblioverso.com")]
    pub email: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres."))]
    pub password: String,
    pub phone: Option<String>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "El correo no es válido."))]
    pub email: String,
    #[validate(length(min = 1, message = "La contraseña es obligatoria."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, message = "El nombre no puede estar vacío."))]
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    #[schema(example = "1990-04-12")]
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    #[validate(length(max = 1000, message = "La biografía es demasiado larga."))]
    pub bio: Option<String>,
    /// Foto nova em `data:image/...;base64,...` (vai para o armazenamento externo)
    pub photo: Option<String>,
    /// URL já publicada, mantida quando não há foto nova
    pub photo_url: Option<String>,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,      // ID do usuário
    pub name: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}
