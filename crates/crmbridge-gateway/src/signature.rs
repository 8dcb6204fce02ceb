// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-SHA256 webhook signatures.
//!
//! Both vendors send the lowercase hex digest of the raw request body,
//! keyed with the shared secret, in a vendor-specific header.

use crmbridge_core::BridgeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, BridgeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BridgeError::Internal(format!("failed to initialize hmac: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex signature against `body` in constant time.
pub fn verify(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), BridgeError> {
    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(BridgeError::Unauthorized("missing webhook signature".into()));
    };
    let expected = hex::decode(signature)
        .map_err(|_| BridgeError::Unauthorized("malformed webhook signature".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BridgeError::Internal(format!("failed to initialize hmac: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| BridgeError::Unauthorized("invalid webhook signature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_body_verifies() {
        let body = br#"{"event":"conversation_created"}"#;
        let sig = sign("s3cret", body).unwrap();
        assert_eq!(sig.len(), 64);
        verify("s3cret", body, Some(&sig)).unwrap();
        verify("s3cret", body, Some(&sig.to_uppercase())).unwrap();
    }

    #[test]
    fn rejects_missing_wrong_and_malformed() {
        let body = b"{}";
        let sig = sign("s3cret", body).unwrap();
        assert!(matches!(
            verify("s3cret", body, None),
            Err(BridgeError::Unauthorized(_))
        ));
        assert!(verify("other", body, Some(&sig)).is_err());
        assert!(verify("s3cret", b"{ }", Some(&sig)).is_err());
        assert!(verify("s3cret", body, Some("zz-not-hex")).is_err());
    }
}
