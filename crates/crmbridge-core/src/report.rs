// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome counters for batch operations.
//!
//! Batch paths (retention sweep, pull syncs) keep going when a single item
//! fails; the failure is logged and counted here instead of aborting.

use serde::Serialize;

/// Result of a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Stale records found.
    pub candidates: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Result of a pull sync from a remote service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Remote records seen.
    pub fetched: usize,
    /// Records created or updated locally.
    pub synced: usize,
    /// Records that already existed or were deliberately left alone.
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// What a webhook handler did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum EventOutcome {
    /// The event changed local state (or was an idempotent repeat).
    Processed,
    /// A recognized event with nothing to act on.
    Skipped(&'static str),
    /// An event type the handler does not know. Acknowledged, not an error.
    Unrecognized,
}
