pub mod auth;
pub mod catalog;
pub mod favorite;
pub mod notification;
pub mod opinion;
pub mod reservation;
