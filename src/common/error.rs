// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::common::i18n;
use crate::middleware::i18n::Locale;
use crate::models::reservation::ReservationStatus;

// Taxonomia única de erros da aplicação. Cada variante tem um código estável
// (para o cliente) e um status HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Identificador inválido: {0}")]
    InvalidId(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Livro {0} não encontrado")]
    BookNotFound(i64),

    #[error("Reserva {0} não encontrada")]
    ReservationNotFound(i64),

    #[error("Notificação {0} não encontrada")]
    NotificationNotFound(i64),

    #[error("Livro {0} não está nos favoritos")]
    NotAFavorite(i64),

    #[error("Transição inválida: {from} -> {to}")]
    IllegalTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Nenhum exemplar disponível para o livro {0}")]
    NoCopyAvailable(i64),

    #[error("Tempo esgotado em {0}")]
    Timeout(&'static str),

    #[error("Serviço externo indisponível: {0}")]
    Unavailable(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Corpo de erro devolvido ao cliente.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidId(_) => "INVALID_ID",
            AppError::EmailAlreadyExists => "EMAIL_TAKEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::BookNotFound(_) => "BOOK_NOT_FOUND",
            AppError::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            AppError::NotificationNotFound(_) => "NOTIFICATION_NOT_FOUND",
            AppError::NotAFavorite(_) => "NOT_A_FAVORITE",
            AppError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            AppError::NoCopyAvailable(_) => "NO_COPY_AVAILABLE",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Unavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::DatabaseError(e) if is_transient_db_error(e) => "UPSTREAM_UNAVAILABLE",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            "VALIDATION_ERROR" | "BAD_REQUEST" | "INVALID_ID" => StatusCode::BAD_REQUEST,
            "INVALID_CREDENTIALS" | "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "USER_NOT_FOUND" | "BOOK_NOT_FOUND" | "RESERVATION_NOT_FOUND"
            | "NOTIFICATION_NOT_FOUND" | "NOT_A_FAVORITE" => StatusCode::NOT_FOUND,
            "EMAIL_TAKEN" | "ILLEGAL_TRANSITION" | "NO_COPY_AVAILABLE" => StatusCode::CONFLICT,
            "TIMEOUT" | "UPSTREAM_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Falhas passageiras: vale a pena tentar de novo.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Timeout(_) | AppError::Unavailable(_) => true,
            AppError::DatabaseError(e) => is_transient_db_error(e),
            _ => false,
        }
    }

    /// Falha em que o banco garante que a transação não foi gravada: sem
    /// conexão do pool, ou rollback por serialização/deadlock.
    pub fn is_replay_safe(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::PoolTimedOut) => true,
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!(code, "Erro Interno do Servidor: {}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .map(Value::String)
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            AppError::BadRequest(reason) | AppError::InvalidId(reason) => {
                Some(Value::String(reason.clone()))
            }
            AppError::IllegalTransition { from, to } => Some(serde_json::json!({
                "from": from,
                "to": to,
            })),
            _ => None,
        };

        ApiError {
            status,
            error: i18n::message(code, &locale.0).to_string(),
            code,
            retryable: self.is_transient(),
            details,
        }
    }
}

fn is_transient_db_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        // 40001 = serialization_failure, 40P01 = deadlock_detected
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_map_to_distinct_codes() {
        assert_eq!(AppError::NotAFavorite(1).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotAFavorite(1).code(), "NOT_A_FAVORITE");
        assert_eq!(AppError::BookNotFound(1).code(), "BOOK_NOT_FOUND");
    }

    #[test]
    fn transient_errors_are_flagged_retryable() {
        let api = AppError::Timeout("list_books").to_api_error(&Locale::default());
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(api.retryable);

        assert!(AppError::DatabaseError(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!AppError::DatabaseError(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn illegal_transition_is_a_conflict_with_details() {
        let err = AppError::IllegalTransition {
            from: ReservationStatus::Completed,
            to: ReservationStatus::Pending,
        };
        let api = err.to_api_error(&Locale("en".to_string()));
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, "ILLEGAL_TRANSITION");
        assert_eq!(
            api.details,
            Some(serde_json::json!({ "from": "completado", "to": "pendiente" }))
        );
    }
}
