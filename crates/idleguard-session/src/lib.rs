//! Session management for idleguard.
//!
//! This crate holds everything about a login that outlives a single
//! inactivity countdown:
//!
//! 1. **Session record**: the credential pair, the signed-in user, and the
//!    inactivity budget derived from the access token ([`Session`])
//! 2. **Renewal**: exchanging the refresh token for a new pair through the
//!    host's [`CredentialRefresher`] ([`RenewalCoordinator`])
//! 3. **Logout**: the host's [`LogoutEffect`], guarded so it runs at most
//!    once per session ([`LogoutOnce`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Watch Layer (above)  ← drives renewal and forced logout
//!     ↕
//! Session Layer (this crate)  ← owns tokens, budget, collaborator seams
//!     ↕
//! Token Layer (below)  ← derives the budget from the access token
//! ```

mod error;
mod logout;
mod refresh;
mod renewal;
mod session;

pub use error::SessionError;
pub use logout::{LogoutEffect, LogoutOnce, LogoutReason};
pub use refresh::CredentialRefresher;
pub use renewal::{RenewalAttempt, RenewalCoordinator, RenewalResult, RenewalTask};
pub use session::{Session, TokenPair, UserId};
