pub mod auth;
pub mod books;
pub mod favorites;
pub mod notifications;
pub mod opinions;
pub mod reservations;
