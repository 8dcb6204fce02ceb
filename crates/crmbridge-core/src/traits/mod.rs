// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seams between the reconcilers and the storage backend.
//!
//! Each trait covers one group of records and uses `#[async_trait]` so the
//! combined [`Store`] can be shared as `Arc<dyn Store>`.

pub mod store;

pub use store::{ContactStore, ConversationStore, IssueStore, StateStore, Store, SurveyStore};
