// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management.
//!
//! Every statement runs on tokio-rusqlite's single background thread, so
//! writes are serialized without extra locking. Open one [`Database`] per
//! process and share it.

use std::path::Path;

use crmbridge_core::BridgeError;
use tracing::debug;

use crate::migrations;

/// Handle to the migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database file, applies PRAGMAs, and
    /// runs migrations.
    pub async fn open(path: &str) -> Result<Self, BridgeError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(BridgeError::storage)?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(BridgeError::storage)?;
        let db = Self { conn };
        db.prepare(true).await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, BridgeError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(BridgeError::storage)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal: bool) -> Result<(), BridgeError> {
        self.conn
            .call(move |conn| -> Result<(), BridgeError> {
                let pragmas = if wal {
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;"
                } else {
                    "PRAGMA foreign_keys = ON;"
                };
                conn.execute_batch(pragmas).map_err(BridgeError::storage)?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => BridgeError::Internal(format!("database thread: {other}")),
            })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), BridgeError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Maps a tokio-rusqlite failure into the shared storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BridgeError {
    BridgeError::storage(e)
}

/// True for UNIQUE/PRIMARY KEY violations.
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
