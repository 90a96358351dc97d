//! The warning view seam.

use std::time::Duration;

/// Displays the "you are about to be logged out" countdown.
///
/// A passive view: the watch calls [`show`](Self::show) when the warning
/// opens and again on every countdown tick, and [`hide`](Self::hide) when
/// the warning closes for any reason. The view's two buttons are routed
/// back through the supervisor as `confirm_logout` / `continue_session`.
pub trait WarningPresenter: Send + Sync + 'static {
    /// Shows (or refreshes) the warning with the time left.
    fn show(&self, remaining: Duration);

    /// Hides the warning. May be called when it is already hidden.
    fn hide(&self);
}
