// src/common/extract.rs

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::{
    common::error::{ApiError, AppError},
    middleware::i18n::Locale,
};

// Igual ao Json do axum, mas rejeições (corpo malformado, campo com tipo
// errado, status desconhecido...) viram BAD_REQUEST no nosso formato, já no
// idioma do Accept-Language.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // O corpo é consumido pelo Json; o idioma vem antes
        let locale = Locale::from_headers(req.headers());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection_to_app_error(rejection).to_api_error(&locale)),
        }
    }
}

fn json_rejection_to_app_error(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Converte o segmento de rota em ID numérico positivo.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidId(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_positive_integers_only() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::InvalidId(_))));
        assert!(matches!(parse_id("0"), Err(AppError::InvalidId(_))));
        assert!(matches!(parse_id("-3"), Err(AppError::InvalidId(_))));
        assert!(matches!(parse_id("4.5"), Err(AppError::InvalidId(_))));
    }
}
