// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use coffer_core::CofferError;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into `CofferError::Storage`.
pub fn map_tr_err<E: std::fmt::Display>(e: tokio_rusqlite::Error<E>) -> CofferError {
    CofferError::Storage(format!("database error: {e}"))
}

/// A migrated SQLite database behind a single background connection.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database file at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, CofferError> {
        if path.is_empty() {
            return Err(CofferError::Validation("database path must not be empty".to_string()));
        }
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                CofferError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CofferError::Storage(format!("failed to open database at {path}: {e}")))?;
        let db = Self { conn };
        db.prepare(true).await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database and run migrations.
    pub async fn open_in_memory() -> Result<Self, CofferError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| CofferError::Storage(format!("failed to open in-memory database: {e}")))?;
        let db = Self { conn };
        db.prepare(false).await?;
        debug!("in-memory database opened");
        Ok(db)
    }

    async fn prepare(&self, wal: bool) -> Result<(), CofferError> {
        self.conn
            .call(move |conn| -> Result<(), CofferError> {
                let pragmas = if wal {
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;"
                } else {
                    "PRAGMA foreign_keys = ON;"
                };
                conn.execute_batch(pragmas)
                    .map_err(|e| CofferError::Storage(format!("failed to apply pragmas: {e}")))?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), CofferError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn
            .close()
            .await
            .map_err(|e| CofferError::Storage(format!("failed to close database: {e}")))?;
        debug!("database closed");
        Ok(())
    }
}
