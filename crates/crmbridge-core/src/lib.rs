// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for crmbridge.
//!
//! This crate provides the error type, domain records, payload helpers, and
//! store traits used throughout the workspace. The storage backend implements
//! the traits defined here; the reconcilers depend only on the traits.

pub mod error;
pub mod json;
pub mod report;
pub mod time;
pub mod traits;
pub mod types;

pub use error::BridgeError;
pub use report::{EventOutcome, SweepReport, SyncReport};
pub use traits::{ContactStore, ConversationStore, IssueStore, StateStore, Store, SurveyStore};
pub use types::{
    ChatMessage, Comment, ContactField, ContactRef, Conversation, ConversationStatus, Customer,
    EntityKind, Integration, IntegrationState, Issue, Lead, MessageType, SenderType, Survey,
    SurveyResponse,
};
