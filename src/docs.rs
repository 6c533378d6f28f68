// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Perfil ---
        handlers::auth::get_profile,
        handlers::auth::update_profile,

        // --- Catálogo ---
        handlers::books::list_books,
        handlers::books::featured_books,
        handlers::books::get_book,
        handlers::books::book_opinions,
        handlers::books::list_categories,

        // --- Opiniões ---
        handlers::opinions::create_opinion,
        handlers::opinions::my_opinions,

        // --- Favoritos ---
        handlers::favorites::list_favorites,
        handlers::favorites::add_favorite,
        handlers::favorites::get_favorite,
        handlers::favorites::remove_favorite,

        // --- Reservas ---
        handlers::reservations::list_reservations,
        handlers::reservations::create_reservation,
        handlers::reservations::update_reservation,

        // --- Notificações ---
        handlers::notifications::list_notifications,
        handlers::notifications::mark_notification_read,
        handlers::notifications::mark_notifications_read,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::UpdateProfilePayload,
            models::auth::AuthResponse,

            // --- Catálogo ---
            models::catalog::StockStatus,
            models::catalog::AvailabilityFilter,
            models::catalog::SortKey,
            models::catalog::BookSummary,
            models::catalog::BookDetail,
            models::catalog::CategoryCount,

            // --- Opiniões ---
            models::opinion::OpinionView,
            models::opinion::CreateOpinionPayload,

            // --- Favoritos ---
            models::favorite::Favorite,
            models::favorite::FavoriteBook,
            models::favorite::AddFavoritePayload,

            // --- Reservas ---
            models::reservation::ReservationStatus,
            models::reservation::Reservation,
            models::reservation::ReservationWithBook,
            models::reservation::CreateReservationPayload,
            models::reservation::UpdateReservationPayload,

            // --- Notificações ---
            models::notification::Notification,
            models::notification::SetReadPayload,
            models::notification::MarkReadPayload,
            models::notification::MarkReadResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Perfil", description = "Dados do Usuário e Foto"),
        (name = "Catálogo", description = "Livros, Categorias e Disponibilidade"),
        (name = "Opiniões", description = "Avaliações dos Leitores"),
        (name = "Favoritos", description = "Livros Marcados pelo Usuário"),
        (name = "Reservas", description = "Reservas, Lista de Espera e Ciclo de Vida"),
        (name = "Notificações", description = "Avisos ao Usuário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
