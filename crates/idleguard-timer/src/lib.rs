//! Timers for idleguard's inactivity watch.
//!
//! Two primitives, both owned by a single watch task:
//!
//! - [`InactivityTimer`]: one pending deadline at most. Re-arming replaces
//!   the previous deadline (last write wins), so a watch can never hold two
//!   inactivity timeouts at once.
//! - [`CountdownTicker`]: the repeating tick that drives the warning
//!   countdown. The only periodic work in the system.
//!
//! # Integration
//!
//! Both are designed to sit inside a watch actor's `tokio::select!` loop.
//! While disarmed/stopped their wait futures pend forever, so the loop
//! simply never takes that branch:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         at = timer.fired() => { /* inactivity timeout */ }
//!         tick = ticker.wait_for_tick() => { /* recompute countdown */ }
//!     }
//! }
//! ```

mod countdown;
mod inactivity;

pub use countdown::{CountdownTick, CountdownTicker};
pub use inactivity::InactivityTimer;

/// Whole milliseconds for log fields, saturating.
pub(crate) fn ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
