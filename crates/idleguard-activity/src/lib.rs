//! Activity signal source for idleguard.
//!
//! Provides the [`RouteClassifier`] and [`ActivitySink`] traits that sit
//! between the host page and the inactivity watch, plus the
//! [`ActivitySource`] that connects them.
//!
//! The source only listens while the current route is tracked. On exempt
//! routes (login, signup, password reset, public landing) interactions are
//! dropped before they reach any sink.

mod routes;
mod source;

pub use routes::{DEFAULT_EXEMPT_ROUTES, ExemptRoutes};
pub use source::{ActivitySource, RouteChange};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Class of raw user interaction reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Mouse/pen movement, clicks.
    Pointer,
    /// Key presses.
    Key,
    /// Wheel or scrollbar movement.
    Scroll,
    /// Touch start/move.
    Touch,
    /// Window resize. Not tracked by default.
    Resize,
    /// Window focus changes. Not tracked by default.
    Focus,
}

impl InteractionKind {
    /// The interaction classes that count as activity unless configured
    /// otherwise.
    pub const DEFAULT_TRACKED: [InteractionKind; 4] = [
        InteractionKind::Pointer,
        InteractionKind::Key,
        InteractionKind::Scroll,
        InteractionKind::Touch,
    ];
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pointer => "pointer",
            Self::Key => "key",
            Self::Scroll => "scroll",
            Self::Touch => "touch",
            Self::Resize => "resize",
            Self::Focus => "focus",
        };
        f.write_str(name)
    }
}

/// Decides which routes are exempt from inactivity tracking.
pub trait RouteClassifier: Send + Sync + 'static {
    /// Returns `true` if activity on `path` must not be tracked.
    fn is_exempt(&self, path: &str) -> bool;
}

/// Receives `ActivityDetected` signals.
///
/// Emission may happen on every raw interaction, so implementations must
/// be cheap and must tolerate high-frequency calls.
pub trait ActivitySink: Send + Sync + 'static {
    /// Called once per tracked interaction.
    fn activity_detected(&self, kind: InteractionKind);
}

impl<F> RouteClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn is_exempt(&self, path: &str) -> bool {
        self(path)
    }
}
