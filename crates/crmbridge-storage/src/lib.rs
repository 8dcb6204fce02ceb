// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for crmbridge.
//!
//! WAL-mode SQLite with embedded migrations, all statements serialized on
//! tokio-rusqlite's background thread, and [`SqliteStore`] implementing the
//! store traits from `crmbridge-core`.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
