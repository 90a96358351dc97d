//! Supervisor configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration.

use std::path::Path;

use idleguard_activity::ExemptRoutes;
use idleguard_token::LifetimeParser;
use idleguard_watch::WatchConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where the logout effect navigates when none is configured.
pub const DEFAULT_LOGOUT_REDIRECT: &str = "/login";

/// Errors raised while loading a [`SupervisorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The content is not valid configuration JSON.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for a [`SessionSupervisor`](crate::SessionSupervisor).
///
/// ```json
/// {
///   "watch": { "warning_lead_ms": 60000, "tick_resolution_ms": 250 },
///   "token": { "claim": "lifetime", "fallback_minutes": 30 },
///   "exempt_routes": ["/", "/login", "/signup", "/reset-password/*"],
///   "logout_redirect": "/login"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Warning lead and countdown resolution.
    pub watch: WatchConfig,
    /// How the inactivity budget is read from access tokens.
    pub token: LifetimeParser,
    /// Routes on which no activity is tracked.
    pub exempt_routes: ExemptRoutes,
    /// Where the logout effect navigates.
    pub logout_redirect: String,
}

impl SupervisorConfig {
    /// Parses a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded supervisor config");
        Self::from_json_str(&json)
    }

    /// Returns a copy with unusable values replaced by defaults.
    pub fn validated(mut self) -> Self {
        self.watch = self.watch.validated();
        self.token = self.token.validated();
        if self.logout_redirect.trim().is_empty() {
            warn!(
                default = DEFAULT_LOGOUT_REDIRECT,
                "empty logout redirect, using default"
            );
            self.logout_redirect = DEFAULT_LOGOUT_REDIRECT.to_string();
        }
        self
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            token: LifetimeParser::default(),
            exempt_routes: ExemptRoutes::default(),
            logout_redirect: DEFAULT_LOGOUT_REDIRECT.to_string(),
        }
    }
}
