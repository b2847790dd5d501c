// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: `Database` wraps one `tokio_rusqlite::Connection`, query modules
//! accept `&Database` and go through `conn.call()`, and that one thread is
//! the single writer. Do NOT create additional Connection instances for
//! writes -- this is what keeps concurrent `put` races decided by the
//! storage engine's constraint check rather than by SQLITE_BUSY retries.

use std::path::Path;
use std::time::Duration;

use botfleet_core::BotfleetError;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database. Clone-cheap via the inner connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled and
    /// run pending migrations.
    pub async fn open(path: &str) -> Result<Self, BotfleetError> {
        Self::open_with_wal(path, true).await
    }

    /// Open with explicit control over WAL mode (`storage.wal_mode` config).
    pub async fn open_with_wal(path: &str, wal_mode: bool) -> Result<Self, BotfleetError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| BotfleetError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        // PRAGMAs and migrations on the writer thread before handing the
        // connection out.
        let setup = conn
            .call(move |conn| -> Result<Result<(), BotfleetError>, rusqlite::Error> {
                if wal_mode {
                    // journal_mode returns the resulting mode as a row.
                    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(Duration::from_secs(5))?;
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        setup?;

        debug!(path = %path, wal = wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying async connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing the writer thread.
    pub async fn close(self) -> Result<(), BotfleetError> {
        self.conn
            .close()
            .await
            .map_err(|e| BotfleetError::Storage {
                source: format!("failed to close database: {e}").into(),
            })
    }
}

/// Convert tokio-rusqlite errors to `BotfleetError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BotfleetError {
    BotfleetError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // The migrated schema is queryable.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen_test.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Second open re-runs the migration runner against an already
        // migrated file.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/deeper/botfleet.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn fingerprint_unique_index_exists() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("index_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let index_count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type = 'index' AND name = 'idx_credentials_fingerprint'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(index_count, 1);
        db.close().await.unwrap();
    }
}
