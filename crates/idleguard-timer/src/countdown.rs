//! Repeating tick that drives the warning countdown.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::ms;

/// Information about a fired tick, returned by
/// [`CountdownTicker::wait_for_tick`].
#[derive(Debug, Clone, Copy)]
pub struct CountdownTick {
    /// Tick number since the last [`start`](CountdownTicker::start), from 1.
    pub tick: u64,
    /// When this tick was observed.
    pub at: Instant,
    /// Time since the countdown started. Consumers derive the remaining
    /// time from this rather than from the tick count, so a delayed or
    /// skipped tick never makes the countdown drift.
    pub elapsed: Duration,
}

/// Fixed-resolution ticker for the warning countdown.
///
/// Stopped by default. [`wait_for_tick`](Self::wait_for_tick) pends forever
/// while stopped. Missed ticks are skipped rather than burst, since only
/// the latest elapsed time matters for a countdown display.
#[derive(Debug)]
pub struct CountdownTicker {
    resolution: Duration,
    interval: Option<Interval>,
    started_at: Option<Instant>,
    ticks: u64,
}

impl CountdownTicker {
    /// Default countdown resolution.
    pub const DEFAULT_RESOLUTION: Duration = Duration::from_millis(250);
    /// Finest accepted resolution.
    pub const MIN_RESOLUTION: Duration = Duration::from_millis(10);
    /// Coarsest accepted resolution.
    pub const MAX_RESOLUTION: Duration = Duration::from_secs(5);

    /// Creates a stopped ticker. Out-of-range resolutions are clamped.
    pub fn new(resolution: Duration) -> Self {
        let clamped = resolution.clamp(Self::MIN_RESOLUTION, Self::MAX_RESOLUTION);
        if clamped != resolution {
            warn!(
                requested_ms = ms(resolution),
                clamped_ms = ms(clamped),
                "countdown resolution out of range, clamping"
            );
        }
        Self {
            resolution: clamped,
            interval: None,
            started_at: None,
            ticks: 0,
        }
    }

    /// (Re)starts the countdown clock. The first tick fires one
    /// resolution from now. Returns the start instant.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Instant {
        let now = Instant::now();
        let mut interval = time::interval_at(now + self.resolution, self.resolution);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
        self.started_at = Some(now);
        self.ticks = 0;
        debug!(
            resolution_ms = ms(self.resolution),
            "countdown ticker started"
        );
        now
    }

    /// Stops the ticker. Returns `true` if it was running.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn stop(&mut self) -> bool {
        let was_running = self.interval.take().is_some();
        if was_running {
            debug!(ticks = self.ticks, "countdown ticker stopped");
        }
        self.started_at = None;
        was_running
    }

    /// Waits for the next tick. Pends forever while stopped.
    pub async fn wait_for_tick(&mut self) -> CountdownTick {
        let (Some(interval), Some(started_at)) = (self.interval.as_mut(), self.started_at) else {
            return std::future::pending().await;
        };
        interval.tick().await;
        let at = Instant::now();
        self.ticks += 1;
        let elapsed = at.saturating_duration_since(started_at);
        trace!(tick = self.ticks, elapsed_ms = ms(elapsed), "countdown tick");
        CountdownTick {
            tick: self.ticks,
            at,
            elapsed,
        }
    }

    /// Whether the ticker is running.
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// When the current countdown started, if running.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Ticks fired since the last start.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// The effective (clamped) resolution.
    pub fn resolution(&self) -> Duration {
        self.resolution
    }
}

impl Default for CountdownTicker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESOLUTION)
    }
}
