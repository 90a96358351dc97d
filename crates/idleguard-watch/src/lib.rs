//! Inactivity watch for idleguard.
//!
//! Each active session gets one watch: an isolated Tokio task (actor model)
//! owning the inactivity timer, the warning countdown, and any in-flight
//! renewal. Signals arrive on a single channel and are processed in order.
//!
//! # Key types
//!
//! - [`WatchMachine`]: the pure transition table: [`Event`] in,
//!   [`Effect`]s out
//! - [`WatchHandle`]: send signals to a running watch, observe its status
//! - [`Phase`]: lifecycle state machine
//! - [`WatchConfig`]: warning lead time and countdown resolution
//! - [`WarningPresenter`]: the view that shows the countdown

mod actor;
mod config;
mod error;
mod machine;
mod presenter;

pub use actor::{WatchContext, WatchHandle, WatchId, WatchTask, spawn_watch};
pub use config::{Phase, WatchConfig};
pub use error::WatchError;
pub use machine::{Effect, Event, WatchMachine, WatchStatus};
pub use presenter::WarningPresenter;
