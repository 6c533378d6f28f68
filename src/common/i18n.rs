// src/common/i18n.rs

// Mensagens de erro por código e idioma. Espanhol é o padrão do Biblioverso.
pub const DEFAULT_LANG: &str = "es";

pub fn message(code: &str, lang: &str) -> &'static str {
    match lang {
        "en" => english(code),
        _ => spanish(code),
    }
}

fn spanish(code: &str) -> &'static str {
    match code {
        "VALIDATION_ERROR" => "Uno o más campos son inválidos.",
        "BAD_REQUEST" => "Solicitud inválida.",
        "INVALID_ID" => "ID inválido.",
        "EMAIL_TAKEN" => "El correo ya está registrado.",
        "INVALID_CREDENTIALS" => "Correo o contraseña incorrectos.",
        "UNAUTHORIZED" => "No autorizado.",
        "FORBIDDEN" => "No tienes permiso para realizar esta acción.",
        "USER_NOT_FOUND" => "Usuario no encontrado.",
        "BOOK_NOT_FOUND" => "Libro no encontrado.",
        "RESERVATION_NOT_FOUND" => "Reserva no encontrada.",
        "NOTIFICATION_NOT_FOUND" => "Notificación no encontrada.",
        "NOT_A_FAVORITE" => "El libro no está en tus favoritos.",
        "ILLEGAL_TRANSITION" => "Cambio de estado de reserva no permitido.",
        "NO_COPY_AVAILABLE" => "No hay ejemplares disponibles.",
        "TIMEOUT" => "La operación tardó demasiado. Intenta de nuevo.",
        "UPSTREAM_UNAVAILABLE" => "Servicio temporalmente no disponible. Intenta de nuevo.",
        _ => "Ocurrió un error inesperado.",
    }
}

fn english(code: &str) -> &'static str {
    match code {
        "VALIDATION_ERROR" => "One or more fields are invalid.",
        "BAD_REQUEST" => "Invalid request.",
        "INVALID_ID" => "Invalid id.",
        "EMAIL_TAKEN" => "This e-mail is already registered.",
        "INVALID_CREDENTIALS" => "Invalid e-mail or password.",
        "UNAUTHORIZED" => "Unauthorized.",
        "FORBIDDEN" => "You are not allowed to perform this action.",
        "USER_NOT_FOUND" => "User not found.",
        "BOOK_NOT_FOUND" => "Book not found.",
        "RESERVATION_NOT_FOUND" => "Reservation not found.",
        "NOTIFICATION_NOT_FOUND" => "Notification not found.",
        "NOT_A_FAVORITE" => "This book is not in your favorites.",
        "ILLEGAL_TRANSITION" => "Reservation status change not allowed.",
        "NO_COPY_AVAILABLE" => "No copies available.",
        "TIMEOUT" => "The operation timed out. Please retry.",
        "UPSTREAM_UNAVAILABLE" => "Service temporarily unavailable. Please retry.",
        _ => "An unexpected error occurred.",
    }
}
