// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per record group.

pub mod contacts;
pub mod conversations;
pub mod issues;
pub mod state;
pub mod surveys;

use chrono::NaiveDateTime;
use crmbridge_core::time;

/// Reads a stored timestamp column, tolerating NULL and malformed text.
pub(crate) fn ts_opt(raw: Option<String>) -> Option<NaiveDateTime> {
    raw.as_deref().and_then(time::from_storage)
}

/// Reads a NOT NULL timestamp column.
pub(crate) fn ts(raw: String) -> NaiveDateTime {
    time::from_storage(&raw).unwrap_or_else(time::now)
}
