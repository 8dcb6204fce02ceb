// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer authentication for the internal API.
//!
//! When no token is configured, every request is rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables the internal API.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    /// Whether the `Authorization` header value carries the expected token.
    pub fn accepts(&self, header: Option<&str>) -> bool {
        let Some(expected) = self.bearer_token.as_deref().filter(|t| !t.is_empty()) else {
            return false;
        };
        header
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected)
    }
}

/// Middleware that requires `Authorization: Bearer <token>`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("internal API has no token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    if auth.accepts(header) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_matching_bearer() {
        let auth = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        assert!(auth.accepts(Some("Bearer secret-token")));
        assert!(!auth.accepts(Some("Bearer secret-tokenx")));
        assert!(!auth.accepts(Some("secret-token")));
        assert!(!auth.accepts(None));
    }

    #[test]
    fn no_token_accepts_nothing() {
        let auth = AuthConfig::default();
        assert!(!auth.accepts(Some("Bearer ")));
        let empty = AuthConfig {
            bearer_token: Some(String::new()),
        };
        assert!(!empty.accepts(Some("Bearer ")));
    }

    #[test]
    fn debug_redacts_token() {
        let auth = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        let debug_output = format!("{auth:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }
}
