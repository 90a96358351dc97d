//! The watch's transition table.
//!
//! [`WatchMachine`] holds no timers and performs no I/O. It consumes one
//! [`Event`] at a time and answers with the [`Effect`]s the owning task must
//! apply, so every race outcome can be tested without a runtime.

use std::time::Duration;

use idleguard_session::LogoutReason;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::Phase;

/// A signal delivered to the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The session became active on a tracked route.
    Activate,
    /// The user interacted with the page.
    ActivityDetected,
    /// The inactivity timer fired.
    InactivityTimeout { now: Instant },
    /// The countdown ticker fired.
    CountdownTick { now: Instant },
    /// The user chose "log out now" on the warning.
    ConfirmLogout,
    /// The user chose "continue" on the warning.
    ContinueSession,
    /// The host asked for a silent renewal.
    RenewRequested,
    /// The refresh endpoint issued a new pair; `budget` is its lifetime.
    RenewalSucceeded { budget: Duration },
    /// The refresh endpoint rejected the session.
    RenewalFailed,
}

/// Work the owning task must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Arm (or re-arm, replacing any pending deadline) the inactivity timer.
    ArmInactivityTimer(Duration),
    /// Clear the inactivity timer.
    CancelInactivityTimer,
    /// Start the countdown ticker.
    StartCountdown,
    /// Stop the countdown ticker.
    StopCountdown,
    /// Show or refresh the warning.
    ShowWarning { remaining: Duration },
    /// Hide the warning.
    HideWarning,
    /// Start a credential refresh with the session's refresh token.
    BeginRenewal,
    /// Drop the in-flight refresh.
    AbortRenewal,
    /// Perform the logout.
    Logout(LogoutReason),
}

/// Snapshot of a watch, published after every processed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchStatus {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Current inactivity budget.
    pub budget: Duration,
    /// Time left on the countdown; `Some` only while in [`Phase::Warning`].
    pub countdown_remaining: Option<Duration>,
    /// Whether a credential refresh is outstanding.
    pub renewal_in_flight: bool,
    /// Why the session ended; `Some` only in [`Phase::Terminated`].
    pub logout_reason: Option<LogoutReason>,
}

impl WatchStatus {
    /// The countdown in whole milliseconds, while the warning is shown.
    pub fn countdown_remaining_ms(&self) -> Option<u64> {
        self.countdown_remaining
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// The inactivity watch state machine.
#[derive(Debug, Clone)]
pub struct WatchMachine {
    phase: Phase,
    budget: Duration,
    warning_lead: Duration,
    countdown_started_at: Option<Instant>,
    countdown_remaining: Duration,
    /// The countdown hit zero while a renewal was outstanding.
    exhausted: bool,
    renewal_in_flight: bool,
    logout_reason: Option<LogoutReason>,
}

impl WatchMachine {
    /// Creates an `Idle` machine for a session with `budget`.
    pub fn new(budget: Duration, warning_lead: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            budget,
            warning_lead,
            countdown_started_at: None,
            countdown_remaining: Duration::ZERO,
            exhausted: false,
            renewal_in_flight: false,
            logout_reason: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn warning_lead(&self) -> Duration {
        self.warning_lead
    }

    pub fn renewal_in_flight(&self) -> bool {
        self.renewal_in_flight
    }

    pub fn logout_reason(&self) -> Option<LogoutReason> {
        self.logout_reason
    }

    /// Time left on the countdown while the warning is shown.
    pub fn countdown_remaining(&self) -> Option<Duration> {
        (self.phase == Phase::Warning).then_some(self.countdown_remaining)
    }

    /// How long the inactivity timer runs before the warning: the budget
    /// minus the lead. `None` when the budget leaves no room for a warning.
    pub fn inactivity_delay(&self) -> Option<Duration> {
        if self.budget > self.warning_lead {
            Some(self.budget - self.warning_lead)
        } else {
            None
        }
    }

    pub fn status(&self) -> WatchStatus {
        WatchStatus {
            phase: self.phase,
            budget: self.budget,
            countdown_remaining: self.countdown_remaining(),
            renewal_in_flight: self.renewal_in_flight,
            logout_reason: self.logout_reason,
        }
    }

    /// Applies one signal and returns the effects to perform, in order.
    ///
    /// Signals that do not apply to the current phase (a tick after the
    /// warning closed, a click after logout) return no effects.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase.is_terminal() {
            trace!(?event, "watch terminated, signal ignored");
            return effects;
        }

        match (self.phase, event) {
            (Phase::Idle, Event::Activate) => {
                self.phase = Phase::Monitoring;
                info!(budget_ms = ms(self.budget), "monitoring started");
                self.arm(&mut effects);
            }
            (Phase::Monitoring, Event::ActivityDetected) => self.arm(&mut effects),
            (Phase::Warning, Event::ActivityDetected) => {
                info!("activity during warning, session continues");
                self.leave_warning(&mut effects);
                self.arm(&mut effects);
            }
            (Phase::Monitoring, Event::InactivityTimeout { now }) => {
                self.enter_warning(now, &mut effects);
            }
            (Phase::Warning, Event::CountdownTick { now }) => self.tick(now, &mut effects),
            (Phase::Warning, Event::ConfirmLogout) => {
                self.terminate(LogoutReason::UserConfirmed, &mut effects);
            }
            (Phase::Warning, Event::ContinueSession) => {
                info!("user chose to continue, renewing");
                self.leave_warning(&mut effects);
                // Safety net while the refresh is outstanding.
                self.arm(&mut effects);
                self.begin_renewal(&mut effects);
            }
            (_, Event::RenewRequested) => self.begin_renewal(&mut effects),
            (phase, Event::RenewalSucceeded { budget }) if self.renewal_in_flight => {
                self.renewal_in_flight = false;
                self.budget = budget;
                match phase {
                    Phase::Warning => {
                        self.leave_warning(&mut effects);
                        self.arm(&mut effects);
                    }
                    Phase::Monitoring => self.arm(&mut effects),
                    _ => {}
                }
            }
            (_, Event::RenewalFailed) if self.renewal_in_flight => {
                self.renewal_in_flight = false;
                self.terminate(LogoutReason::RenewalFailed, &mut effects);
            }
            (phase, event) => {
                trace!(%phase, ?event, "signal does not apply, ignored");
            }
        }
        effects
    }

    fn arm(&self, effects: &mut Vec<Effect>) {
        match self.inactivity_delay() {
            Some(delay) => {
                debug!(delay_ms = ms(delay), "inactivity timer armed");
                effects.push(Effect::ArmInactivityTimer(delay));
            }
            None => {
                debug!(
                    budget_ms = ms(self.budget),
                    lead_ms = ms(self.warning_lead),
                    "budget does not exceed warning lead, timer left unarmed"
                );
                effects.push(Effect::CancelInactivityTimer);
            }
        }
    }

    fn enter_warning(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        self.phase = Phase::Warning;
        self.countdown_started_at = Some(now);
        self.countdown_remaining = self.warning_lead;
        self.exhausted = false;
        info!(remaining_ms = ms(self.warning_lead), "inactivity warning shown");
        effects.push(Effect::CancelInactivityTimer);
        effects.push(Effect::ShowWarning {
            remaining: self.warning_lead,
        });
        effects.push(Effect::StartCountdown);
    }

    fn tick(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        if self.exhausted {
            return;
        }
        let elapsed = self
            .countdown_started_at
            .map_or(Duration::ZERO, |started| now.saturating_duration_since(started));
        let remaining = self
            .warning_lead
            .saturating_sub(elapsed)
            .min(self.countdown_remaining);
        self.countdown_remaining = remaining;

        if !remaining.is_zero() {
            trace!(remaining_ms = ms(remaining), "countdown tick");
            effects.push(Effect::ShowWarning { remaining });
            return;
        }

        if self.renewal_in_flight {
            info!("countdown exhausted with renewal in flight, awaiting result");
            self.exhausted = true;
            effects.push(Effect::StopCountdown);
            effects.push(Effect::ShowWarning {
                remaining: Duration::ZERO,
            });
        } else {
            self.terminate(LogoutReason::InactivityTimeout, effects);
        }
    }

    fn begin_renewal(&mut self, effects: &mut Vec<Effect>) {
        if self.renewal_in_flight {
            debug!("renewal already in flight");
            return;
        }
        self.renewal_in_flight = true;
        effects.push(Effect::BeginRenewal);
    }

    fn leave_warning(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::Monitoring;
        self.countdown_started_at = None;
        self.countdown_remaining = Duration::ZERO;
        self.exhausted = false;
        effects.push(Effect::StopCountdown);
        effects.push(Effect::HideWarning);
    }

    fn terminate(&mut self, reason: LogoutReason, effects: &mut Vec<Effect>) {
        if self.phase == Phase::Warning {
            effects.push(Effect::StopCountdown);
            effects.push(Effect::HideWarning);
        }
        effects.push(Effect::CancelInactivityTimer);
        if self.renewal_in_flight {
            self.renewal_in_flight = false;
            effects.push(Effect::AbortRenewal);
        }
        self.phase = Phase::Terminated;
        self.countdown_started_at = None;
        self.logout_reason = Some(reason);
        info!(%reason, "watch terminated");
        effects.push(Effect::Logout(reason));
    }
}

fn ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
