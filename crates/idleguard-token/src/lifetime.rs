//! Lifetime claim → inactivity budget.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::{TokenError, decode_claims};

/// Claim consulted when none is configured.
pub const DEFAULT_LIFETIME_CLAIM: &str = "lifetime";

/// Window used when the token cannot be introspected.
pub const DEFAULT_FALLBACK_MINUTES: u64 = 30;

const MILLIS_PER_MINUTE: u64 = 60_000;

/// Reads the lifetime (in minutes) an issuer embedded in an access token.
///
/// Introspection failures are not fatal: [`lifetime`](Self::lifetime)
/// returns [`fallback`](Self::fallback) instead. A session should not end
/// just because its token is in a shape we did not expect.
///
/// ```rust
/// use std::time::Duration;
/// use idleguard_token::LifetimeParser;
///
/// let parser = LifetimeParser::default();
/// // Not a JWT at all: the 30 minute fallback applies.
/// assert_eq!(parser.lifetime("opaque"), Duration::from_secs(30 * 60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeParser {
    /// Name of the payload claim carrying the lifetime in minutes.
    pub claim: String,
    /// Lifetime assumed when the claim cannot be read.
    pub fallback_minutes: u64,
}

impl Default for LifetimeParser {
    fn default() -> Self {
        Self {
            claim: DEFAULT_LIFETIME_CLAIM.to_string(),
            fallback_minutes: DEFAULT_FALLBACK_MINUTES,
        }
    }
}

impl LifetimeParser {
    /// Replaces unusable settings with the defaults.
    ///
    /// A blank claim name or a zero fallback would make every session
    /// expire on arrival.
    pub fn validated(mut self) -> Self {
        if self.claim.trim().is_empty() {
            warn!(default = DEFAULT_LIFETIME_CLAIM, "blank lifetime claim name, using default");
            self.claim = DEFAULT_LIFETIME_CLAIM.to_string();
        }
        if self.fallback_minutes == 0 {
            warn!(
                default = DEFAULT_FALLBACK_MINUTES,
                "fallback_minutes is 0, using default"
            );
            self.fallback_minutes = DEFAULT_FALLBACK_MINUTES;
        }
        self
    }

    /// The lifetime assumed for tokens that cannot be introspected.
    pub fn fallback(&self) -> Duration {
        minutes_to_duration(self.fallback_minutes)
    }

    /// Decodes the token's lifetime, reporting why it could not be read.
    ///
    /// # Errors
    /// Any [`TokenError`]: malformed token, bad encoding, missing claim, or
    /// a claim that is not a positive whole number of minutes.
    pub fn try_lifetime(&self, token: &str) -> Result<Duration, TokenError> {
        let claims = decode_claims(token)?;
        let value = claims
            .get(&self.claim)
            .ok_or_else(|| TokenError::MissingClaim(self.claim.clone()))?;

        let minutes = parse_minutes(value).ok_or_else(|| TokenError::InvalidClaim {
            claim: self.claim.clone(),
            value: value.to_string(),
        })?;

        Ok(minutes_to_duration(minutes))
    }

    /// Decodes the token's lifetime, or returns the fallback window.
    pub fn lifetime(&self, token: &str) -> Duration {
        match self.try_lifetime(token) {
            Ok(lifetime) => lifetime,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback_minutes = self.fallback_minutes,
                    "token lifetime unreadable, using fallback"
                );
                self.fallback()
            }
        }
    }

    /// [`lifetime`](Self::lifetime) in whole milliseconds.
    pub fn lifetime_ms(&self, token: &str) -> u64 {
        u64::try_from(self.lifetime(token).as_millis()).unwrap_or(u64::MAX)
    }
}

/// Accepts a positive JSON integer or a string holding one.
fn parse_minutes(value: &JsonValue) -> Option<u64> {
    let minutes = match value {
        JsonValue::Number(n) => n.as_u64()?,
        JsonValue::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (minutes > 0).then_some(minutes)
}

fn minutes_to_duration(minutes: u64) -> Duration {
    Duration::from_millis(minutes.saturating_mul(MILLIS_PER_MINUTE))
}
