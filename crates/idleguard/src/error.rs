//! Unified error type for idleguard.

use idleguard_session::SessionError;
use idleguard_token::TokenError;
use idleguard_watch::WatchError;

use crate::{ConfigError, SupervisorError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `idleguard` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum IdleguardError {
    /// Token introspection failed (only from the fallible parser API).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A session-level error (refresh rejected, renewal aborted).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A watch could not be signalled.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A supervisor intent was not applicable.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
