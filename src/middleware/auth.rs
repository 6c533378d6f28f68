use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

// O middleware em si: valida o Bearer e coloca o usuário nos extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>() else {
        return AppError::InvalidToken.to_api_error(&locale).into_response();
    };

    match app_state.auth_service.validate_token(bearer.token()).await {
        Ok(user) => {
            tracing::debug!(user_id = user.id, "Requisição autenticada");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.to_api_error(&locale).into_response(),
    }
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&Locale::from_headers(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{self, header, StatusCode};

    use super::*;
    use crate::common::i18n;

    #[tokio::test]
    async fn missing_user_is_rejected_in_the_callers_language() {
        let (mut parts, _) = http::Request::builder()
            .header(header::ACCEPT_LANGUAGE, "en-GB")
            .body(())
            .unwrap()
            .into_parts();

        let Err(rejection) = AuthenticatedUser::from_request_parts(&mut parts, &()).await else {
            panic!("sem usuário nos extensions não deveria autenticar");
        };
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
        assert_eq!(rejection.error, i18n::message("UNAUTHORIZED", "en"));
    }
}
