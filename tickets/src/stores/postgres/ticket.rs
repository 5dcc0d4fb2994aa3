//! `PostgreSQL` ticket store implementation.
//!
//! # Example
//!
//! ```no_run
//! use gatepass_tickets::stores::PostgresTicketStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/gatepass").await?;
//! let store = PostgresTicketStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::operations;
use crate::error::{Result, TicketError};
use crate::providers::TicketStore;
use crate::providers::ticket_store::ensure_legal_transition;
use chrono::{DateTime, Utc};
use gatepass_core::{
    EventId, ParticipantMetadata, Ticket, TicketStatus, TicketToken, UnknownStatus, UserId,
};
use sqlx::{PgPool, Row};

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// `PostgreSQL` ticket store.
///
/// Redemption is a single conditional `UPDATE`; the row count tells whether
/// this caller won.
#[derive(Clone)]
pub struct PostgresTicketStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a new `PostgreSQL` ticket store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TicketError::storage("migrate", e))?;
        Ok(())
    }

    fn ticket_from_row(row: &sqlx::postgres::PgRow) -> Result<Ticket> {
        let read = |e: sqlx::Error| TicketError::Serialization(e.to_string());

        let status: String = row.try_get("status").map_err(read)?;
        let participant: sqlx::types::Json<ParticipantMetadata> =
            row.try_get("participant").map_err(read)?;

        Ok(Ticket {
            token: TicketToken::new(row.try_get::<String, _>("token").map_err(read)?),
            event_id: EventId::new(row.try_get::<String, _>("event_id").map_err(read)?),
            event_name: row.try_get("event_name").map_err(read)?,
            user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(read)?),
            participant: participant.0,
            status: status
                .parse()
                .map_err(|e: UnknownStatus| TicketError::Serialization(e.to_string()))?,
            issued_at: row.try_get("issued_at").map_err(read)?,
            redeemed_at: row.try_get("redeemed_at").map_err(read)?,
            redeemed_by: row
                .try_get::<Option<String>, _>("redeemed_by")
                .map_err(read)?
                .map(UserId::new),
        })
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

impl TicketStore for PostgresTicketStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let result = sqlx::query(
            r"
            INSERT INTO tickets
                (token, event_id, event_name, user_id, participant, status, issued_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(ticket.token.as_str())
        .bind(ticket.event_id.as_str())
        .bind(&ticket.event_name)
        .bind(ticket.user_id.as_str())
        .bind(sqlx::types::Json(&ticket.participant))
        .bind(ticket.status.as_str())
        .bind(ticket.issued_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(TicketError::DuplicateToken {
                fingerprint: ticket.token.fingerprint().to_string(),
            }),
            Err(e) => Err(TicketError::storage(operations::INSERT, e)),
        }
    }

    async fn find_ticket_by_token(&self, token: &TicketToken) -> Result<Option<Ticket>> {
        let row = sqlx::query(
            r"
            SELECT token, event_id, event_name, user_id, participant, status,
                   issued_at, redeemed_at, redeemed_by
            FROM tickets
            WHERE token = $1
            ",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TicketError::storage(operations::FIND, e))?;

        row.as_ref().map(Self::ticket_from_row).transpose()
    }

    async fn compare_and_set_status(
        &self,
        token: &TicketToken,
        expected: TicketStatus,
        new: TicketStatus,
        redeemed_at: DateTime<Utc>,
        redeemed_by: &UserId,
    ) -> Result<bool> {
        ensure_legal_transition(expected, new)?;

        // ✅ SECURITY: the WHERE clause is the check; one affected row means
        // this caller performed the transition.
        let result = sqlx::query(
            r"
            UPDATE tickets
            SET status = $3, redeemed_at = $4, redeemed_by = $5
            WHERE token = $1 AND status = $2
            ",
        )
        .bind(token.as_str())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(redeemed_at)
        .bind(redeemed_by.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| TicketError::storage(operations::COMPARE_AND_SET, e))?;

        Ok(result.rows_affected() == 1)
    }
}
