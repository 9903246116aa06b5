//! Database module
//!
//! Provides persistence for conversations and issued API keys.

mod schema;

pub use schema::{KEY_EXPIRY_MARGIN, SCHEMA};

use crate::service::{KeyInfo, TokenConversation, TokenType};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt conversation data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    // A panic mid-statement cannot leave the connection half-written, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Conversation Operations ====================

    /// Load the user's conversation, or a fresh idle one when none is stored
    /// or the stored one has expired
    pub fn get_conversation(&self, user_id: &str, now: DateTime<Utc>) -> DbResult<TokenConversation> {
        let conn = self.lock();
        conn.execute(
            "DELETE FROM conversations WHERE user_id = ?1 AND expires_at <= ?2",
            params![user_id, now.timestamp()],
        )?;

        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM conversations WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(TokenConversation::new(user_id)),
        }
    }

    /// Insert or replace the conversation, keyed by its id
    pub fn save_conversation(
        &self,
        conversation: &TokenConversation,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let data = serde_json::to_string(conversation)?;
        self.lock().execute(
            "INSERT INTO conversations (user_id, data, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at",
            params![conversation.id, data, expires_at.timestamp()],
        )?;
        Ok(())
    }

    pub fn delete_conversation(&self, user_id: &str) -> DbResult<()> {
        self.lock().execute(
            "DELETE FROM conversations WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    // ==================== API Key Operations ====================

    /// Live keys, soonest expiry first. Expired rows are purged on the way.
    pub fn list_api_keys(&self, user_id: &str, now: DateTime<Utc>) -> DbResult<Vec<KeyInfo>> {
        let conn = self.lock();
        conn.execute(
            "DELETE FROM api_keys WHERE user_id = ?1 AND expires_at <= ?2",
            params![user_id, now.timestamp()],
        )?;

        let mut stmt = conn.prepare(
            "SELECT key_id, token_type, expires_at FROM api_keys
             WHERE user_id = ?1
             ORDER BY expires_at, key_id",
        )?;

        let keys = stmt
            .query_map(params![user_id], |row| {
                let token_type: String = row.get(1)?;
                let stored: i64 = row.get(2)?;
                Ok(KeyInfo {
                    key_id: row.get(0)?,
                    token_type: TokenType::parse(&token_type).unwrap_or(TokenType::Web),
                    expires_at: from_unix(stored.saturating_add(KEY_EXPIRY_MARGIN)),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    /// Record an issued key. Re-adding a key id replaces its type and expiry.
    pub fn add_api_key(
        &self,
        user_id: &str,
        key_id: &str,
        token_type: TokenType,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let stored = now
            .timestamp()
            .saturating_add(ttl)
            .saturating_sub(KEY_EXPIRY_MARGIN);

        self.lock().execute(
            "INSERT INTO api_keys (user_id, key_id, token_type, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, key_id) DO UPDATE SET token_type = excluded.token_type, expires_at = excluded.expires_at",
            params![user_id, key_id, token_type.as_str(), stored],
        )?;
        Ok(())
    }

    /// Forget a key. Removing an unknown key is not an error.
    pub fn remove_api_key(&self, user_id: &str, key_id: &str) -> DbResult<()> {
        self.lock().execute(
            "DELETE FROM api_keys WHERE user_id = ?1 AND key_id = ?2",
            params![user_id, key_id],
        )?;
        Ok(())
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
