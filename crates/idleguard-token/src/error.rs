//! Error types for token introspection.

/// Why a token's lifetime could not be read.
///
/// These never reach the user: [`LifetimeParser::lifetime`](crate::LifetimeParser::lifetime)
/// logs them and substitutes the fallback window. They are public so
/// callers of [`LifetimeParser::try_lifetime`](crate::LifetimeParser::try_lifetime)
/// can tell the cases apart.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not shaped like `header.payload.signature`.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The payload segment is not valid base64url.
    #[error("payload is not valid base64url: {0}")]
    Encoding(#[source] base64::DecodeError),

    /// The decoded payload is not a JSON object.
    #[error("payload is not a JSON object: {0}")]
    Json(#[source] serde_json::Error),

    /// The payload has no claim with the configured name.
    #[error("claim `{0}` is missing")]
    MissingClaim(String),

    /// The claim exists but is not a positive whole number of minutes.
    #[error("claim `{claim}` is not a positive number of minutes: {value}")]
    InvalidClaim { claim: String, value: String },
}
