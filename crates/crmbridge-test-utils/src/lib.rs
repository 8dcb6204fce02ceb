// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for crmbridge integration tests.
//!
//! Assembles the bridge on an in-memory store so tests can drive the
//! HTTP surface without a real database or vendor account.
//!
//! # Components
//!
//! - [`TestHarness`] - in-memory store, both integrations, and a router
//! - [`fixtures`] - vendor webhook payloads and signing helpers

pub mod fixtures;
pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
