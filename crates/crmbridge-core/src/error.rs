// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every crmbridge crate.

use thiserror::Error;

/// The primary error type used across store traits, API clients, and reconcilers.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (invalid TOML, missing connection fields, policy conflicts).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport or non-2xx failures from a remote vendor API.
    #[error("{service} API error: {method} {url}: {message}")]
    Remote {
        service: &'static str,
        method: String,
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Inbound payload is malformed or lacks a required field.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Webhook signature or bearer token did not verify.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A record failed a business validation rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// An insert hit the uniqueness constraint on an external id.
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// A required record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The integration is switched off in configuration.
    #[error("{0} integration is disabled")]
    Disabled(&'static str),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Returns true for the duplicate-key failure raised by a racing insert.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns true when the failure lies with the caller's input rather than
    /// with this service or a remote dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload(_)
                | Self::Unauthorized(_)
                | Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Disabled(_)
        )
    }
}
