//! Watch configuration and lifecycle phase.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// WatchConfig
// ---------------------------------------------------------------------------

/// Configuration for an inactivity watch.
///
/// Hosts override these through `SupervisorConfig`; missing fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How long before forced logout the warning appears, in milliseconds.
    pub warning_lead_ms: u64,

    /// Countdown refresh interval while the warning is shown, in
    /// milliseconds. Clamped by the ticker to 10 ms..=5 s.
    pub tick_resolution_ms: u64,
}

impl WatchConfig {
    /// Default warning lead: one minute.
    pub const DEFAULT_WARNING_LEAD_MS: u64 = 60_000;

    /// Default countdown resolution.
    pub const DEFAULT_TICK_RESOLUTION_MS: u64 = 250;

    /// Returns a copy with unusable values replaced by defaults.
    ///
    /// A zero lead would make the warning close the moment it opens.
    pub fn validated(mut self) -> Self {
        if self.warning_lead_ms == 0 {
            warn!(
                default_ms = Self::DEFAULT_WARNING_LEAD_MS,
                "warning lead of 0 ms is not usable, using default"
            );
            self.warning_lead_ms = Self::DEFAULT_WARNING_LEAD_MS;
        }
        if self.tick_resolution_ms == 0 {
            self.tick_resolution_ms = Self::DEFAULT_TICK_RESOLUTION_MS;
        }
        self
    }

    /// The warning lead as a [`Duration`].
    pub fn warning_lead(&self) -> Duration {
        Duration::from_millis(self.warning_lead_ms)
    }

    /// The countdown resolution as a [`Duration`].
    pub fn tick_resolution(&self) -> Duration {
        Duration::from_millis(self.tick_resolution_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            warning_lead_ms: Self::DEFAULT_WARNING_LEAD_MS,
            tick_resolution_ms: Self::DEFAULT_TICK_RESOLUTION_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a watch.
///
/// ```text
///          activate            timeout
///   Idle ───────────▶ Monitoring ──────▶ Warning
///                        ▲  │  ▲            │
///                activity└──┘  └────────────┤ activity / continue / renewed
///                                           │
///          Terminated ◀─────────────────────┘ exhausted / confirm / failure
/// ```
///
/// - **Idle**: session exists but its route is exempt; nothing is timed.
/// - **Monitoring**: the inactivity timer is armed (unless the budget is
///   too short to ever warn).
/// - **Warning**: the countdown is running and shown to the user.
/// - **Terminated**: logged out. Terminal; the watch is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Monitoring,
    Warning,
    Terminated,
}

impl Phase {
    /// Returns `true` while the session is being timed.
    pub fn is_watching(&self) -> bool {
        matches!(self, Self::Monitoring | Self::Warning)
    }

    /// Returns `true` once the watch has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Monitoring => write!(f, "Monitoring"),
            Self::Warning => write!(f, "Warning"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_default() {
        let config = WatchConfig::default();
        assert_eq!(config.warning_lead(), Duration::from_secs(60));
        assert_eq!(config.tick_resolution(), Duration::from_millis(250));
    }

    #[test]
    fn test_watch_config_partial_json_keeps_defaults() {
        let config: WatchConfig = serde_json::from_str(r#"{"warning_lead_ms": 30000}"#).unwrap();
        assert_eq!(config.warning_lead_ms, 30_000);
        assert_eq!(config.tick_resolution_ms, 250);
    }

    #[test]
    fn test_validated_replaces_zero_values() {
        let config = WatchConfig {
            warning_lead_ms: 0,
            tick_resolution_ms: 0,
        }
        .validated();
        assert_eq!(config, WatchConfig::default());
    }

    #[test]
    fn test_phase_predicates() {
        assert!(!Phase::Idle.is_watching());
        assert!(Phase::Monitoring.is_watching());
        assert!(Phase::Warning.is_watching());
        assert!(!Phase::Terminated.is_watching());
        assert!(Phase::Terminated.is_terminal());
        assert!(!Phase::Warning.is_terminal());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Monitoring.to_string(), "Monitoring");
        assert_eq!(Phase::Terminated.to_string(), "Terminated");
    }
}
