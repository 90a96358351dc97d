//! Session types: the record of one authenticated login.
//!
//! A session tracks:
//! - WHO is signed in (`UserId`)
//! - WHICH credentials they hold (access + refresh token)
//! - HOW LONG they may stay idle (the inactivity budget)

use std::fmt;
use std::time::Duration;

use idleguard_token::LifetimeParser;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Reference to the signed-in user.
///
/// Opaque to idleguard; only used for logging and to tell whether a
/// session is active.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// An access/refresh credential pair, as returned by login or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived bearer credential; carries the lifetime claim.
    pub access_token: String,
    /// Credential exchanged for the next pair.
    pub refresh_token: String,
}

impl TokenPair {
    /// Builds a pair from anything string-like.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Credentials never show up in logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authenticated login.
///
/// Created on successful login (or when a stored session is rehydrated at
/// startup). The inactivity budget is derived from the access token and
/// recomputed whenever the pair is replaced by a renewal.
#[derive(Clone)]
pub struct Session {
    tokens: TokenPair,
    current_user: Option<UserId>,
    inactivity_budget: Duration,
}

impl Session {
    /// Creates a session, deriving the inactivity budget from the access
    /// token with `parser`.
    pub fn new(user: Option<UserId>, tokens: TokenPair, parser: &LifetimeParser) -> Self {
        let inactivity_budget = parser.lifetime(&tokens.access_token);
        Self {
            tokens,
            current_user: user,
            inactivity_budget,
        }
    }

    /// Creates a session with an explicit budget, bypassing introspection.
    pub fn with_budget(user: Option<UserId>, tokens: TokenPair, budget: Duration) -> Self {
        Self {
            tokens,
            current_user: user,
            inactivity_budget: budget,
        }
    }

    /// A session is active iff it has a user.
    pub fn is_active(&self) -> bool {
        self.current_user.is_some()
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<&UserId> {
        self.current_user.as_ref()
    }

    /// Total time without activity before forced logout.
    pub fn inactivity_budget(&self) -> Duration {
        self.inactivity_budget
    }

    /// The budget in whole milliseconds.
    pub fn inactivity_budget_ms(&self) -> u64 {
        u64::try_from(self.inactivity_budget.as_millis()).unwrap_or(u64::MAX)
    }

    /// The refresh token to present on the next renewal.
    pub fn refresh_token(&self) -> &str {
        &self.tokens.refresh_token
    }

    /// The current access token.
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    /// Replaces the credential pair and recomputes the budget.
    ///
    /// Only the renewal path calls this; see
    /// [`RenewalCoordinator::commit`](crate::RenewalCoordinator::commit).
    pub(crate) fn replace_tokens(&mut self, tokens: TokenPair, parser: &LifetimeParser) -> Duration {
        self.inactivity_budget = parser.lifetime(&tokens.access_token);
        self.tokens = tokens;
        self.inactivity_budget
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tokens", &self.tokens)
            .field("current_user", &self.current_user)
            .field("inactivity_budget", &self.inactivity_budget)
            .finish()
    }
}
