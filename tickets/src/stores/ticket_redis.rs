//! Redis-based ticket store.
//!
//! # Architecture
//!
//! Each ticket is one hash at `gatepass:ticket:{token}`:
//!
//! | field         | content                                  |
//! |---------------|------------------------------------------|
//! | `record`      | JSON of the ticket as issued (immutable) |
//! | `status`      | `issued` or `redeemed`                   |
//! | `redeemed_at` | RFC 3339 timestamp, once redeemed        |
//! | `redeemed_by` | operator id, once redeemed               |
//!
//! Insert and redemption are Lua scripts, so the existence check and the
//! status check-and-set run atomically on the Redis server. Tickets carry no
//! TTL: a redeemed ticket must keep answering "already used".
//!
//! # Example
//!
//! ```no_run
//! use gatepass_tickets::stores::RedisTicketStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisTicketStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::operations;
use crate::error::{Result, TicketError};
use crate::providers::TicketStore;
use crate::providers::ticket_store::ensure_legal_transition;
use chrono::{DateTime, Utc};
use gatepass_core::{Ticket, TicketStatus, TicketToken, UserId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::collections::HashMap;

const INSERT_SCRIPT: &str = r"
    if redis.call('EXISTS', KEYS[1]) == 1 then
        return 0
    end
    redis.call('HSET', KEYS[1], 'record', ARGV[1], 'status', ARGV[2])
    return 1
";

const COMPARE_AND_SET_SCRIPT: &str = r"
    local status = redis.call('HGET', KEYS[1], 'status')
    if status ~= ARGV[1] then
        return 0
    end
    redis.call('HSET', KEYS[1], 'status', ARGV[2], 'redeemed_at', ARGV[3], 'redeemed_by', ARGV[4])
    return 1
";

/// `Redis` ticket store with atomic redemption.
///
/// # Thread Safety
///
/// This type is `Clone`; clones share the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisTicketStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    insert_script: Script,
    compare_and_set_script: Script,
}

impl RedisTicketStore {
    /// Connect to `Redis`.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the URL is malformed or the connection
    /// fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| TicketError::storage("connect", format!("invalid Redis URL: {e}")))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| TicketError::storage("connect", e))?;

        tracing::info!("RedisTicketStore initialized successfully");

        Ok(Self {
            conn_manager,
            insert_script: Script::new(INSERT_SCRIPT),
            compare_and_set_script: Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }

    /// `gatepass:ticket:{token}`
    fn ticket_key(token: &TicketToken) -> String {
        format!("gatepass:ticket:{}", token.as_str())
    }

    fn ticket_from_fields(fields: &HashMap<String, String>) -> Result<Option<Ticket>> {
        let Some(record) = fields.get("record") else {
            return Ok(None);
        };

        let mut ticket: Ticket = serde_json::from_str(record)?;

        if let Some(status) = fields.get("status") {
            ticket.status = status
                .parse()
                .map_err(|e: gatepass_core::UnknownStatus| TicketError::Serialization(e.to_string()))?;
        }

        ticket.redeemed_at = fields
            .get("redeemed_at")
            .map(|at| DateTime::parse_from_rfc3339(at).map(|at| at.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| TicketError::Serialization(format!("invalid redeemed_at: {e}")))?;

        ticket.redeemed_by = fields.get("redeemed_by").map(|by| UserId::new(by.as_str()));

        Ok(Some(ticket))
    }
}

impl TicketStore for RedisTicketStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let record = serde_json::to_string(ticket)?;

        let inserted: i32 = self
            .insert_script
            .key(Self::ticket_key(&ticket.token))
            .arg(record)
            .arg(ticket.status.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| TicketError::storage(operations::INSERT, e))?;

        if inserted == 0 {
            return Err(TicketError::DuplicateToken {
                fingerprint: ticket.token.fingerprint().to_string(),
            });
        }

        tracing::debug!(
            token = %ticket.token.fingerprint(),
            event_id = %ticket.event_id,
            "Stored ticket in Redis"
        );

        Ok(())
    }

    async fn find_ticket_by_token(&self, token: &TicketToken) -> Result<Option<Ticket>> {
        let mut conn = self.conn_manager.clone();

        let fields: HashMap<String, String> = conn
            .hgetall(Self::ticket_key(token))
            .await
            .map_err(|e| TicketError::storage(operations::FIND, e))?;

        Self::ticket_from_fields(&fields)
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
        let mut conn = self.conn_manager.clone();

        // SECURITY: the status check and the write happen in one script, so
        // concurrent scans of the same token see exactly one `1`.
        let applied: i32 = self
            .compare_and_set_script
            .key(Self::ticket_key(token))
            .arg(expected.as_str())
            .arg(new.as_str())
            .arg(redeemed_at.to_rfc3339())
            .arg(redeemed_by.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| TicketError::storage(operations::COMPARE_AND_SET, e))?;

        Ok(applied == 1)
    }
}
