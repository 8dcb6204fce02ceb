// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business-side contact logic shared by both integrations.
//!
//! Resolves remote contacts to Customers and Leads, links chat contact ids,
//! applies the contact policy, creates and scores Leads, and converts Leads
//! to Customers.

pub mod contact;
pub mod conversion;
pub mod linking;
pub mod naming;
pub mod promotion;
pub mod resolver;
pub mod scoring;

pub use contact::RemoteContact;
pub use conversion::convert_lead_to_customer;
pub use linking::link_chat_contact;
pub use promotion::{apply_contact_policy, maybe_create_lead_from_conversation, resolve_lead_source};
pub use resolver::{resolve_by_email, resolve_by_phone};
pub use scoring::{apply_lead_score, score_response};
