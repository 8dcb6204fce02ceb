// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for crmbridge.
//!
//! Receives Chatwoot and Formbricks webhooks, verifies their signatures, and
//! hands them to the integrations. A bearer-authenticated `/v1` API lets the
//! host application report saved records and trigger manual actions.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod signature;
pub mod webhook;

pub use auth::AuthConfig;
pub use server::{GatewayState, build_router, start_server};
