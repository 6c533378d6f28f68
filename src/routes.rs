// src/routes.rs

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

// x-request-id em UUID v4
#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let catalog_routes = Router::new()
        .route("/books", get(handlers::books::list_books))
        .route("/books/featured", get(handlers::books::featured_books))
        .route("/books/{id}", get(handlers::books::get_book))
        .route("/books/{id}/opinions", get(handlers::books::book_opinions))
        .route("/categories", get(handlers::books::list_categories));

    // Rotas protegidas pelo Bearer
    let user_routes = Router::new()
        .route(
            "/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route("/opinions", post(handlers::opinions::create_opinion))
        .route("/opinions/me", get(handlers::opinions::my_opinions))
        .route(
            "/favorites",
            get(handlers::favorites::list_favorites).post(handlers::favorites::add_favorite),
        )
        .route(
            "/favorites/{book_id}",
            get(handlers::favorites::get_favorite).delete(handlers::favorites::remove_favorite),
        )
        .route(
            "/reservations",
            get(handlers::reservations::list_reservations)
                .post(handlers::reservations::create_reservation),
        )
        .route("/reservations/{id}", patch(handlers::reservations::update_reservation))
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/read", post(handlers::notifications::mark_notifications_read))
        .route("/notifications/{id}", patch(handlers::notifications::mark_notification_read))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/auth", auth_routes)
        .merge(catalog_routes)
        .merge(user_routes);

    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{header, Method, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        common::{i18n, retry::RetryPolicy},
        db::{InMemoryStore, Repositories},
        services::media::DisabledMediaStore,
    };

    fn app() -> Router {
        let store = Arc::new(InMemoryStore::with_demo_catalog());
        let mut state = AppState::from_repositories(
            Repositories::in_memory(store),
            Arc::new(DisabledMediaStore),
            "segredo-de-teste".to_string(),
            RetryPolicy::default(),
        );
        state.auth_service = state.auth_service.clone().with_bcrypt_cost(4);
        build_router(state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Lucía", "email": email, "password": "secreta123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn book_id(app: &Router, title: &str) -> i64 {
        let (_, books) = send(app, Method::GET, "/api/books", None, None).await;
        books
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["title"] == title)
            .and_then(|b| b["id"].as_i64())
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public_and_carries_request_id() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn catalog_lists_and_filters_books() {
        let app = app();

        let (status, books) = send(&app, Method::GET, "/api/books", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(books.as_array().unwrap().len(), 3);

        let (_, available) =
            send(&app, Method::GET, "/api/books?availability=available", None, None).await;
        let titles: Vec<&str> = available
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|b| b["title"].as_str())
            .collect();
        assert_eq!(titles, vec!["Cien años de soledad", "Sapiens"]);

        let (_, history) = send(&app, Method::GET, "/api/books?category=historia", None, None).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["title"], "Sapiens");
    }

    #[tokio::test]
    async fn bad_identifiers_and_parameters_are_rejected() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/api/books/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ID");

        let (status, body) = send(&app, Method::GET, "/api/books/999999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "BOOK_NOT_FOUND");

        let (status, body) = send(&app, Method::GET, "/api/books?sort=price", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_bearer() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/api/reservations", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) =
            send(&app, Method::GET, "/api/reservations", Some("nao-e-um-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn error_messages_follow_accept_language() {
        let request = Request::get("/api/profile")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], i18n::message("UNAUTHORIZED", "en"));
    }

    #[tokio::test]
    async fn malformed_bodies_are_rejected_in_the_requested_language() {
        let app = app();
        for (lang, expected) in [("en", "en"), ("fr", "es")] {
            let request = Request::post("/api/auth/login")
                .header(header::ACCEPT_LANGUAGE, lang)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ \"email\": "))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();

            assert_eq!(body["code"], "BAD_REQUEST");
            assert_eq!(body["error"], i18n::message("BAD_REQUEST", expected));
        }
    }

    #[tokio::test]
    async fn login_returns_token_for_registered_user() {
        let app = app();
        register(&app, "lucia@biblioverso.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "lucia@biblioverso.com", "password": "secreta123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();

        let (status, profile) = send(&app, Method::GET, "/api/profile", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["email"], "lucia@biblioverso.com");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "lucia@biblioverso.com", "password": "errada" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn reservation_flow_over_http() {
        let app = app();
        let token = register(&app, "lector@biblioverso.com").await;
        let sapiens = book_id(&app, "Sapiens").await;

        let (status, first) = send(
            &app,
            Method::POST,
            "/api/reservations",
            Some(&token),
            Some(json!({ "bookId": sapiens })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["status"], "pendiente");

        let (_, second) = send(
            &app,
            Method::POST,
            "/api/reservations",
            Some(&token),
            Some(json!({ "bookId": sapiens })),
        )
        .await;
        assert_eq!(second["status"], "espera");

        // O dono só pode cancelar
        let id = first["id"].as_i64().unwrap();
        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/reservations/{id}"),
            Some(&token),
            Some(json!({ "status": "completado" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/reservations/{id}"),
            Some(&token),
            Some(json!({ "status": "cancelado" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelado");

        let (_, mine) = send(&app, Method::GET, "/api/reservations", Some(&token), None).await;
        let promoted = mine
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["id"] == second["id"])
            .unwrap();
        assert_eq!(promoted["status"], "pendiente");

        let (_, notifications) =
            send(&app, Method::GET, "/api/notifications", Some(&token), None).await;
        assert!(notifications.as_array().unwrap().len() >= 3);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/notifications/read",
            Some(&token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"].as_u64().unwrap() as usize, notifications.as_array().unwrap().len());
    }

    #[tokio::test]
    async fn notifications_can_be_marked_unread_over_http() {
        let app = app();
        let token = register(&app, "avisos@biblioverso.com").await;
        let sapiens = book_id(&app, "Sapiens").await;
        send(
            &app,
            Method::POST,
            "/api/reservations",
            Some(&token),
            Some(json!({ "bookId": sapiens })),
        )
        .await;

        let (_, notifications) =
            send(&app, Method::GET, "/api/notifications", Some(&token), None).await;
        let id = notifications[0]["id"].as_i64().unwrap();
        let uri = format!("/api/notifications/{id}");

        let (status, body) =
            send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "read": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["read"], true);

        let (status, body) =
            send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "read": false }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["read"], false);

        // Sem o campo, marca como lida
        let (_, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({}))).await;
        assert_eq!(body["read"], true);
    }

    #[tokio::test]
    async fn favorites_are_idempotent_over_http() {
        let app = app();
        let token = register(&app, "fav@biblioverso.com").await;
        let cosmos = book_id(&app, "Cosmos").await;

        for _ in 0..2 {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/favorites",
                Some(&token),
                Some(json!({ "bookId": cosmos })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, favorites) = send(&app, Method::GET, "/api/favorites", Some(&token), None).await;
        assert_eq!(favorites.as_array().unwrap().len(), 1);

        let uri = format!("/api/favorites/{cosmos}");
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_A_FAVORITE");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (status, doc) = send(&app(), Method::GET, "/api-docs/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/reservations/{id}"].is_object());
    }
}
