//! Logout effect and its at-most-once guard.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The host called `on_logout` (user clicked "sign out").
    UserRequested,
    /// The user chose "log out now" on the inactivity warning.
    UserConfirmed,
    /// The warning countdown ran out with no renewal in flight.
    InactivityTimeout,
    /// The refresh endpoint rejected the session.
    RenewalFailed,
}

impl LogoutReason {
    /// `true` for logouts the system initiated rather than the user.
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::InactivityTimeout | Self::RenewalFailed)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserRequested => "user_requested",
            Self::UserConfirmed => "user_confirmed",
            Self::InactivityTimeout => "inactivity_timeout",
            Self::RenewalFailed => "renewal_failed",
        };
        f.write_str(name)
    }
}

/// Clears externally held auth state and navigates away.
///
/// Implemented by the host (drop stored tokens, reset caches, route to the
/// sign-in page). Called at most once per session through [`LogoutOnce`].
pub trait LogoutEffect: Send + Sync + 'static {
    /// Performs the logout and navigates to `redirect`.
    fn perform_logout(&self, redirect: &str, reason: LogoutReason);
}

/// Runs a [`LogoutEffect`] at most once per session.
///
/// Cloned into every party that can end the session (the watch task for
/// forced logouts, the supervisor for explicit ones). Whichever calls
/// [`fire`](Self::fire) first performs the logout; later calls are no-ops.
pub struct LogoutOnce<L> {
    effect: Arc<L>,
    redirect: Arc<str>,
    fired: Arc<AtomicBool>,
}

impl<L> Clone for LogoutOnce<L> {
    fn clone(&self) -> Self {
        Self {
            effect: Arc::clone(&self.effect),
            redirect: Arc::clone(&self.redirect),
            fired: Arc::clone(&self.fired),
        }
    }
}

impl<L: LogoutEffect> LogoutOnce<L> {
    /// Creates a fresh, unfired guard for one session.
    pub fn new(effect: Arc<L>, redirect: &str) -> Self {
        Self {
            effect,
            redirect: Arc::from(redirect),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Performs the logout unless it already happened. Returns `true` if
    /// this call performed it.
    pub fn fire(&self, reason: LogoutReason) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!(%reason, redirect = %self.redirect, "performing logout");
        self.effect.perform_logout(&self.redirect, reason);
        true
    }

    /// Closes the latch without performing the logout.
    ///
    /// Used when a session is replaced or torn down: a watch that is still
    /// finishing its last step can no longer log out or touch the warning
    /// view. Returns `false` if the latch was already closed.
    pub fn retire(&self) -> bool {
        let open = !self.fired.swap(true, Ordering::AcqRel);
        if open {
            debug!(redirect = %self.redirect, "logout latch retired");
        }
        open
    }

    /// Whether the logout has been performed, or the latch was retired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Where the logout navigates to.
    pub fn redirect(&self) -> &str {
        &self.redirect
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingLogout {
        calls: Mutex<Vec<(String, LogoutReason)>>,
    }

    impl LogoutEffect for RecordingLogout {
        fn perform_logout(&self, redirect: &str, reason: LogoutReason) {
            self.calls.lock().unwrap().push((redirect.to_string(), reason));
        }
    }

    #[test]
    fn test_fire_performs_logout_once() {
        let effect = Arc::new(RecordingLogout::default());
        let once = LogoutOnce::new(Arc::clone(&effect), "/login");

        assert!(once.fire(LogoutReason::InactivityTimeout));
        assert!(!once.fire(LogoutReason::UserRequested));

        let calls = effect.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![("/login".to_string(), LogoutReason::InactivityTimeout)]
        );
    }

    #[test]
    fn test_clones_share_the_latch() {
        let effect = Arc::new(RecordingLogout::default());
        let supervisor_side = LogoutOnce::new(Arc::clone(&effect), "/login");
        let watch_side = supervisor_side.clone();

        assert!(watch_side.fire(LogoutReason::RenewalFailed));
        assert!(supervisor_side.has_fired());
        assert!(!supervisor_side.fire(LogoutReason::UserRequested));
        assert_eq!(effect.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_separate_sessions_have_separate_latches() {
        let effect = Arc::new(RecordingLogout::default());
        let first = LogoutOnce::new(Arc::clone(&effect), "/login");
        let second = LogoutOnce::new(Arc::clone(&effect), "/login");

        assert!(first.fire(LogoutReason::UserRequested));
        assert!(second.fire(LogoutReason::UserRequested));
        assert_eq!(effect.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_retire_closes_latch_without_logout() {
        let effect = Arc::new(RecordingLogout::default());
        let supervisor_side = LogoutOnce::new(Arc::clone(&effect), "/login");
        let watch_side = supervisor_side.clone();

        assert!(supervisor_side.retire());
        assert!(!supervisor_side.retire());
        assert!(watch_side.has_fired());
        assert!(!watch_side.fire(LogoutReason::InactivityTimeout));
        assert!(effect.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_retire_after_fire_is_noop() {
        let effect = Arc::new(RecordingLogout::default());
        let once = LogoutOnce::new(Arc::clone(&effect), "/login");

        assert!(once.fire(LogoutReason::UserConfirmed));
        assert!(!once.retire());
        assert_eq!(effect.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_forced_reasons() {
        assert!(LogoutReason::InactivityTimeout.is_forced());
        assert!(LogoutReason::RenewalFailed.is_forced());
        assert!(!LogoutReason::UserConfirmed.is_forced());
        assert!(!LogoutReason::UserRequested.is_forced());
    }
}
