//! Durable key/value preferences.
//!
//! # Responsibility
//! - Persist small session settings (the viewer profile code) across runs.
//!
//! # Invariants
//! - `set` replaces any previous value for the same key.
//! - `get` on a missing key returns `Ok(None)`.

use crate::repo::record_repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Key/value preference storage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> RepoResult<()>;
}

/// Preferences kept in the `preferences` table.
///
/// Owns its connection so it can live next to a store whose own connection
/// is held by the store worker.
pub struct SqlitePreferenceStore {
    conn: Connection,
}

impl SqlitePreferenceStore {
    /// Wraps a migrated connection (see [`crate::db::open_db`]).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }
}
