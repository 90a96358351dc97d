//! Error types for the session layer.

/// Errors that can occur while managing a session's credentials.
///
/// None of these are shown to the user. A failed renewal ends the session
/// through the same forced-logout path as an inactivity timeout.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The refresh endpoint rejected the refresh token or could not be
    /// reached.
    #[error("credential refresh failed: {0}")]
    RefreshFailed(String),

    /// The renewal task ended without producing a result (panicked or was
    /// aborted).
    #[error("renewal aborted: {0}")]
    RenewalAborted(String),

    /// The session has no refresh token to renew with.
    #[error("session has no refresh token")]
    MissingRefreshToken,
}
