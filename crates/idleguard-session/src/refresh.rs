//! Credential refresh hook.
//!
//! idleguard does not talk to the auth server itself. The host supplies a
//! [`CredentialRefresher`] wrapping whatever HTTP client it already uses,
//! and the renewal coordinator calls it when the session must be extended.

use crate::{SessionError, TokenPair};

/// Exchanges a refresh token for a new credential pair.
///
/// # Trait bounds
///
/// - `Send + Sync` → the refresher is shared with the renewal task, which
///   may run on any worker thread.
/// - `'static` → it lives as long as the supervisor that owns it.
///
/// # Example
///
/// ```rust
/// use idleguard_session::{CredentialRefresher, SessionError, TokenPair};
///
/// /// Rejects every refresh: sessions end when their budget does.
/// struct NoRefresh;
///
/// impl CredentialRefresher for NoRefresh {
///     async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, SessionError> {
///         Err(SessionError::RefreshFailed("refresh disabled".into()))
///     }
/// }
/// ```
pub trait CredentialRefresher: Send + Sync + 'static {
    /// Calls the refresh endpoint.
    ///
    /// # Returns
    /// - `Ok(TokenPair)`: the new access/refresh pair
    /// - `Err(SessionError::RefreshFailed)`: rejected or unreachable; the
    ///   session will be logged out, no retry is attempted
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<TokenPair, SessionError>> + Send;
}
