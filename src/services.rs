pub mod auth;
pub mod catalog_service;
pub mod favorite_service;
pub mod media;
pub mod notification_service;
pub mod opinion_service;
pub mod reservation_service;
