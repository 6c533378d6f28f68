// src/db/reservation_repo.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    models::reservation::{Reservation, ReservationStatus, ReservationWithBook, TransitionOutcome},
};

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Decisão atômica: reserva `pendiente` se todos os exemplares pedidos
    /// foram reservados, `espera` caso contrário.
    async fn create(&self, user_id: i64, book_id: i64, quantity: i32) -> Result<Reservation, AppError>;
    async fn find(&self, id: i64) -> Result<Option<Reservation>, AppError>;
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ReservationWithBook>, AppError>;
    /// Aplica a transição e seus efeitos no estoque numa única transação.
    async fn transition(&self, id: i64, next: ReservationStatus) -> Result<TransitionOutcome, AppError>;
}

const RESERVATION_COLUMNS: &str = "id, user_id, book_id, status, quantity, created_at, updated_at";

// Reserva até $2 exemplares livres. O sub-select pula linhas travadas por
// outra transação e o filtro externo garante que só AVAILABLE vira RESERVED.
const CLAIM_COPIES: &str = r#"
    UPDATE stock SET status = 'RESERVED'
    WHERE id IN (
        SELECT id FROM stock
        WHERE book_id = $1 AND status = 'AVAILABLE'
        ORDER BY id
        LIMIT $2
        FOR UPDATE SKIP LOCKED
    )
    AND status = 'AVAILABLE'
    RETURNING id
"#;

#[derive(Clone)]
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn claim_copies(conn: &mut PgConnection, book_id: i64, quantity: i32) -> Result<Vec<i64>, AppError> {
    let claimed = sqlx::query_scalar::<_, i64>(CLAIM_COPIES)
        .bind(book_id)
        .bind(i64::from(quantity))
        .fetch_all(&mut *conn)
        .await?;
    Ok(claimed)
}

async fn release_copies(conn: &mut PgConnection, copy_ids: &[i64]) -> Result<(), AppError> {
    if copy_ids.is_empty() {
        return Ok(());
    }
    sqlx::query("UPDATE stock SET status = 'AVAILABLE', reservation_id = NULL WHERE id = ANY($1)")
        .bind(copy_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn attach_copies(conn: &mut PgConnection, copy_ids: &[i64], reservation_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE stock SET reservation_id = $1 WHERE id = ANY($2)")
        .bind(reservation_id)
        .bind(copy_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// Compare-and-swap do status: só grava se ninguém mudou a reserva antes.
async fn swap_status(
    conn: &mut PgConnection,
    id: i64,
    expected: ReservationStatus,
    next: ReservationStatus,
) -> Result<Option<Reservation>, AppError> {
    let sql = format!(
        r#"
        UPDATE reservations SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING {RESERVATION_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, Reservation>(&sql)
        .bind(id)
        .bind(expected)
        .bind(next)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(updated)
}

// Promove a fila de espera do livro em ordem de chegada enquanto houver
// exemplares. Para na primeira reserva que não cabe (FIFO estrito).
async fn promote_waitlist(conn: &mut PgConnection, book_id: i64) -> Result<Vec<Reservation>, AppError> {
    let sql = format!(
        r#"
        SELECT {RESERVATION_COLUMNS} FROM reservations
        WHERE book_id = $1 AND status = 'espera'
        ORDER BY created_at, id
        FOR UPDATE
        "#
    );
    let waiting = sqlx::query_as::<_, Reservation>(&sql)
        .bind(book_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut promoted = Vec::new();
    for candidate in waiting {
        let claimed = claim_copies(conn, book_id, candidate.quantity).await?;
        if claimed.len() < candidate.quantity as usize {
            release_copies(conn, &claimed).await?;
            break;
        }
        attach_copies(conn, &claimed, candidate.id).await?;
        if let Some(reservation) =
            swap_status(conn, candidate.id, ReservationStatus::Waiting, ReservationStatus::Pending).await?
        {
            promoted.push(reservation);
        }
    }
    Ok(promoted)
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create(&self, user_id: i64, book_id: i64, quantity: i32) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serializa reservas concorrentes do mesmo livro
        let book: Option<i64> =
            sqlx::query_scalar("SELECT id FROM books WHERE id = $1 AND deleted = FALSE FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;
        if book.is_none() {
            return Err(AppError::BookNotFound(book_id));
        }

        let claimed = claim_copies(&mut tx, book_id, quantity).await?;
        let status = if claimed.len() == quantity as usize {
            ReservationStatus::Pending
        } else {
            // Reserva parcial não vale: devolve o que pegou e entra na fila
            release_copies(&mut tx, &claimed).await?;
            ReservationStatus::Waiting
        };

        let sql = format!(
            r#"
            INSERT INTO reservations (user_id, book_id, status, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(user_id)
            .bind(book_id)
            .bind(status)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await?;

        if status == ReservationStatus::Pending {
            attach_copies(&mut tx, &claimed, reservation.id).await?;
        }

        tx.commit().await?;
        Ok(reservation)
    }

    async fn find(&self, id: i64) -> Result<Option<Reservation>, AppError> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reservation)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ReservationWithBook>, AppError> {
        let reservations = sqlx::query_as::<_, ReservationWithBook>(
            r#"
            SELECT
                r.id, r.user_id, r.book_id, r.status, r.quantity, r.created_at, r.updated_at,
                b.title AS book_title, b.cover_url
            FROM reservations r
            JOIN books b ON b.id = r.book_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn transition(&self, id: i64, next: ReservationStatus) -> Result<TransitionOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Mesma ordem de travas que `create`: primeiro o livro, depois a reserva
        let book_id: i64 = sqlx::query_scalar("SELECT book_id FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::ReservationNotFound(id))?;

        sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::IllegalTransition { from: current.status, to: next });
        }

        match (current.status, next) {
            (ReservationStatus::Waiting, ReservationStatus::Pending) => {
                let claimed = claim_copies(&mut tx, book_id, current.quantity).await?;
                if claimed.len() < current.quantity as usize {
                    return Err(AppError::NoCopyAvailable(book_id));
                }
                attach_copies(&mut tx, &claimed, id).await?;
            }
            (ReservationStatus::Pending, ReservationStatus::Completed) => {
                sqlx::query("UPDATE stock SET status = 'CHECKED_OUT' WHERE reservation_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            (ReservationStatus::Pending, ReservationStatus::Cancelled) => {
                sqlx::query(
                    r#"
                    UPDATE stock SET status = 'AVAILABLE', reservation_id = NULL
                    WHERE reservation_id = $1 AND status = 'RESERVED'
                    "#,
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        let reservation = swap_status(&mut tx, id, current.status, next)
            .await?
            .ok_or(AppError::IllegalTransition { from: current.status, to: next })?;

        let promoted = if current.status == ReservationStatus::Pending && next == ReservationStatus::Cancelled {
            promote_waitlist(&mut tx, book_id).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        Ok(TransitionOutcome { reservation, promoted })
    }
}

// Rodam contra um Postgres real: `DATABASE_URL=... cargo test -- --ignored`.
// O `sqlx::test` cria um banco descartável por teste e aplica `migrations/`.
#[cfg(test)]
mod tests {
    use super::*;

    async fn user(pool: &PgPool, email: &str) -> i64 {
        sqlx::query_scalar("INSERT INTO users (name, email, password_hash) VALUES ('Lector', $1, 'x') RETURNING id")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn book(pool: &PgPool, title: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM books WHERE title = $1")
            .bind(title)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn stock(pool: &PgPool, book_id: i64) -> Vec<(String, Option<i64>)> {
        sqlx::query_as(
            r#"
            SELECT status::TEXT, reservation_id FROM stock
            WHERE book_id = $1
            ORDER BY status::TEXT, reservation_id NULLS FIRST
            "#,
        )
            .bind(book_id)
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn copies_are_reserved_until_they_run_out(pool: PgPool) {
        let repo = PgReservationRepository::new(pool.clone());
        let cien = book(&pool, "Cien años de soledad").await;

        let mut statuses = Vec::new();
        for email in ["a@biblioverso.com", "b@biblioverso.com", "c@biblioverso.com"] {
            let user_id = user(&pool, email).await;
            statuses.push(repo.create(user_id, cien, 1).await.unwrap().status);
        }

        assert_eq!(
            statuses,
            [ReservationStatus::Pending, ReservationStatus::Pending, ReservationStatus::Waiting]
        );
        assert!(stock(&pool, cien).await.iter().all(|(status, owner)| status == "RESERVED" && owner.is_some()));
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn partial_claims_are_released(pool: PgPool) {
        let repo = PgReservationRepository::new(pool.clone());
        let cien = book(&pool, "Cien años de soledad").await;
        let user_id = user(&pool, "muchos@biblioverso.com").await;

        let reservation = repo.create(user_id, cien, 3).await.unwrap();

        assert_eq!(reservation.status, ReservationStatus::Waiting);
        assert_eq!(
            stock(&pool, cien).await,
            [("AVAILABLE".to_string(), None), ("AVAILABLE".to_string(), None)]
        );
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn cancelling_promotes_the_waitlist_in_arrival_order(pool: PgPool) {
        let repo = PgReservationRepository::new(pool.clone());
        let sapiens = book(&pool, "Sapiens").await;
        let first = repo.create(user(&pool, "1@biblioverso.com").await, sapiens, 1).await.unwrap();
        let second = repo.create(user(&pool, "2@biblioverso.com").await, sapiens, 1).await.unwrap();
        let third = repo.create(user(&pool, "3@biblioverso.com").await, sapiens, 1).await.unwrap();
        assert_eq!(second.status, ReservationStatus::Waiting);
        assert_eq!(third.status, ReservationStatus::Waiting);

        let outcome = repo.transition(first.id, ReservationStatus::Cancelled).await.unwrap();

        assert_eq!(outcome.reservation.status, ReservationStatus::Cancelled);
        let promoted: Vec<i64> = outcome.promoted.iter().map(|r| r.id).collect();
        assert_eq!(promoted, [second.id]);
        assert_eq!(repo.find(third.id).await.unwrap().unwrap().status, ReservationStatus::Waiting);
        assert_eq!(
            stock(&pool, sapiens).await,
            [("CHECKED_OUT".to_string(), None), ("RESERVED".to_string(), Some(second.id))]
        );
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn finished_reservations_do_not_change_again(pool: PgPool) {
        let repo = PgReservationRepository::new(pool.clone());
        let sapiens = book(&pool, "Sapiens").await;
        let reservation = repo.create(user(&pool, "fim@biblioverso.com").await, sapiens, 1).await.unwrap();

        let outcome = repo.transition(reservation.id, ReservationStatus::Completed).await.unwrap();
        assert_eq!(outcome.reservation.status, ReservationStatus::Completed);

        let err = repo
            .transition(reservation.id, ReservationStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::IllegalTransition { from: ReservationStatus::Completed, to: ReservationStatus::Cancelled }
        ));
        assert_eq!(
            stock(&pool, sapiens).await,
            [("CHECKED_OUT".to_string(), None), ("CHECKED_OUT".to_string(), Some(reservation.id))]
        );

        let err = repo.transition(999_999, ReservationStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, AppError::ReservationNotFound(999_999)));
    }
}
