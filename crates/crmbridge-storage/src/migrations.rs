// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled in with `embed_migrations!`
//! and applied on every open. Refinery records applied versions in
//! `refinery_schema_history`.

use crmbridge_core::BridgeError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies all pending migrations.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), BridgeError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(BridgeError::storage)?;
    for migration in report.applied_migrations() {
        tracing::debug!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}
