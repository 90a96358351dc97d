//! Single-shot, last-write-wins inactivity timer.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{self, Instant, Sleep};
use tracing::{debug, trace};

use crate::ms;

/// A single deferred timeout that can be re-armed or cancelled.
///
/// At most one deadline is pending. [`arm`](Self::arm) while armed moves
/// the deadline instead of adding a second one; [`cancel`](Self::cancel)
/// on a disarmed timer is a no-op. The underlying `Sleep` is allocated on
/// first arm and reset in place afterwards, so a burst of activity does
/// not churn the timer wheel with new entries.
#[derive(Debug, Default)]
pub struct InactivityTimer {
    sleep: Option<Pin<Box<Sleep>>>,
    deadline: Option<Instant>,
    arm_count: u64,
}

impl InactivityTimer {
    /// Creates a disarmed timer. Does not touch the runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the timeout `duration` from now, replacing any pending
    /// one. Returns the new deadline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(&mut self, duration: Duration) -> Instant {
        let deadline = Instant::now() + duration;
        match &mut self.sleep {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(time::sleep_until(deadline))),
        }
        let replaced = self.deadline.replace(deadline).is_some();
        self.arm_count += 1;
        trace!(
            duration_ms = ms(duration),
            replaced,
            "inactivity timer armed"
        );
        deadline
    }

    /// Clears the pending timeout. Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.deadline.take().is_some();
        if was_armed {
            debug!("inactivity timer cancelled");
        }
        was_armed
    }

    /// Waits for the pending timeout and disarms the timer.
    ///
    /// Returns the deadline that fired. Pends forever while disarmed.
    /// Cancel-safe: dropping the future before it completes leaves the
    /// timer armed with the same deadline.
    pub async fn fired(&mut self) -> Instant {
        let (Some(deadline), Some(sleep)) = (self.deadline, self.sleep.as_mut()) else {
            return std::future::pending().await;
        };
        sleep.as_mut().await;
        self.deadline = None;
        deadline
    }

    /// Whether a timeout is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the pending deadline, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// How many times the timer has been armed since creation.
    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }
}
