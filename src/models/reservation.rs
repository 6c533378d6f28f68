// src/models/reservation.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// Ciclo de vida de uma reserva. Os nomes externos (JSON e enum do Postgres)
// são os usados pelo front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_status")]
pub enum ReservationStatus {
    #[serde(rename = "pendiente")]
    #[sqlx(rename = "pendiente")]
    Pending,
    #[serde(rename = "espera")]
    #[sqlx(rename = "espera")]
    Waiting,
    #[serde(rename = "completado")]
    #[sqlx(rename = "completado")]
    Completed,
    #[serde(rename = "cancelado")]
    #[sqlx(rename = "cancelado")]
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pendiente",
            ReservationStatus::Waiting => "espera",
            ReservationStatus::Completed => "completado",
            ReservationStatus::Cancelled => "cancelado",
        }
    }

    /// Tabela de transições permitidas. Estados terminais não saem do lugar.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Cancelled) | (Waiting, Pending) | (Waiting, Cancelled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub status: ReservationStatus,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Reserva com o título do livro, para a listagem do usuário
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationWithBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub reservation: Reservation,
    pub book_title: String,
    pub cover_url: Option<String>,
}

// Resultado de uma transição: a reserva atualizada e as reservas em espera
// que foram promovidas por causa dela (apenas em cancelamentos).
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub reservation: Reservation,
    pub promoted: Vec<Reservation>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationPayload {
    #[validate(range(min = 1, message = "El libro es obligatorio."))]
    #[schema(example = 3)]
    pub book_id: i64,
    #[validate(range(min = 1, max = 5, message = "La cantidad debe estar entre 1 y 5."))]
    #[serde(default = "default_quantity")]
    #[schema(example = 1)]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReservationPayload {
    #[schema(example = "cancelado")]
    pub status: ReservationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn transition_table_matches_lifecycle() {
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Waiting.can_transition_to(Pending));
        assert!(Waiting.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Waiting));
        assert!(!Waiting.can_transition_to(Completed));
        for terminal in [Completed, Cancelled] {
            for next in [Pending, Waiting, Completed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_uses_spanish_wire_names() {
        assert_eq!(serde_json::to_value(Waiting).unwrap(), "espera");
        let parsed: ReservationStatus = serde_json::from_str("\"cancelado\"").unwrap();
        assert_eq!(parsed, Cancelled);
        assert!(serde_json::from_str::<ReservationStatus>("\"archivado\"").is_err());
    }
}
