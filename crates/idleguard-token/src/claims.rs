//! Unverified claim decoding for JWT-shaped tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value as JsonValue};

use crate::TokenError;

/// The decoded (but unverified) payload of an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    inner: Map<String, JsonValue>,
}

impl TokenClaims {
    /// Gets a claim value by key.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.inner.get(key)
    }

    /// Whether the payload carries a claim with this key.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of claims in the payload.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the payload is an empty object.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Decodes the payload segment of a `header.payload.signature` token.
///
/// Trailing `=` padding is tolerated even though JWTs are unpadded, since
/// some issuers emit it anyway. The signature is not checked.
///
/// # Errors
///
/// - [`TokenError::Malformed`]: not exactly three segments, or an empty
///   payload segment
/// - [`TokenError::Encoding`]: payload is not base64url
/// - [`TokenError::Json`]: payload is not a JSON object
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let payload = segments[1].trim_end_matches('=');
    if payload.is_empty() {
        return Err(TokenError::Malformed("empty payload segment".into()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(TokenError::Encoding)?;
    let inner: Map<String, JsonValue> =
        serde_json::from_slice(&bytes).map_err(TokenError::Json)?;

    Ok(TokenClaims { inner })
}
