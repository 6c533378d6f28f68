pub mod error;
pub mod extract;
pub mod fallback;
pub mod i18n;
pub mod retry;
