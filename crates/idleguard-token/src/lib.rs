//! Access-token lifetime introspection for idleguard.
//!
//! The inactivity budget of a session is derived from the lifetime the
//! issuer embedded in the access token. This crate decodes that claim:
//!
//! - **Claims** ([`TokenClaims`], [`decode_claims`]): the unverified JSON
//!   payload of a JWT-shaped token.
//! - **Lifetime** ([`LifetimeParser`]): turns the lifetime claim (minutes)
//!   into a [`Duration`](std::time::Duration), falling back to a fixed
//!   window when the token cannot be read.
//! - **Errors** ([`TokenError`]): why a token could not be introspected.
//!
//! ```text
//! Session layer (above)  ← asks for the budget after login / renewal
//!     ↕
//! Token layer (this crate)  ← decodes header.payload.signature
//! ```
//!
//! Nothing here verifies signatures. The token is only read to size a
//! client-side countdown; the issuer remains the authority on validity.

mod claims;
mod error;
mod lifetime;

pub use claims::{TokenClaims, decode_claims};
pub use error::TokenError;
pub use lifetime::{DEFAULT_FALLBACK_MINUTES, DEFAULT_LIFETIME_CLAIM, LifetimeParser};
