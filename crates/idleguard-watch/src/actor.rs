//! Watch actor: an isolated Tokio task that owns one session's timers.
//!
//! Each watch runs in its own task, communicating with the outside world
//! through an mpsc channel. The task owns the [`Session`], the
//! [`WatchMachine`], the inactivity timer, the countdown ticker and any
//! in-flight renewal; nothing else can touch them.

use std::fmt;
use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use idleguard_activity::{ActivitySink, InteractionKind};
use idleguard_session::{
    CredentialRefresher, LogoutEffect, LogoutOnce, RenewalAttempt, RenewalCoordinator,
    RenewalResult, RenewalTask, Session,
};
use idleguard_timer::{CountdownTicker, InactivityTimer};
use idleguard_token::LifetimeParser;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::{
    Effect, Event, Phase, WarningPresenter, WatchConfig, WatchError, WatchMachine, WatchStatus,
};

static NEXT_WATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one watch (one login) in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

impl WatchId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_WATCH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W-{}", self.0)
    }
}

/// Commands sent to a watch actor through its channel.
#[derive(Debug)]
pub(crate) enum WatchCommand {
    /// Start monitoring (the session reached a tracked route).
    Activate,
    /// The user interacted with the page.
    Activity(InteractionKind),
    /// "Log out now" on the warning.
    ConfirmLogout,
    /// "Continue" on the warning.
    ContinueSession,
    /// Silent renewal requested by the host.
    RenewNow,
}

impl WatchCommand {
    fn into_event(self) -> Event {
        match self {
            Self::Activate => Event::Activate,
            Self::Activity(kind) => {
                trace!(%kind, "activity");
                Event::ActivityDetected
            }
            Self::ConfirmLogout => Event::ConfirmLogout,
            Self::ContinueSession => Event::ContinueSession,
            Self::RenewNow => Event::RenewRequested,
        }
    }
}

/// Handle to a running watch actor.
///
/// Cheap to clone: an unbounded sender plus a status receiver. Sending
/// never waits, so activity can be reported from synchronous code.
#[derive(Clone)]
pub struct WatchHandle {
    watch_id: WatchId,
    sender: mpsc::UnboundedSender<WatchCommand>,
    status: watch::Receiver<WatchStatus>,
}

impl WatchHandle {
    pub fn watch_id(&self) -> WatchId {
        self.watch_id
    }

    /// Starts monitoring. A no-op unless the watch is `Idle`.
    pub fn activate(&self) -> Result<(), WatchError> {
        self.send(WatchCommand::Activate)
    }

    /// Reports user activity.
    pub fn activity(&self, kind: InteractionKind) -> Result<(), WatchError> {
        self.send(WatchCommand::Activity(kind))
    }

    /// Delivers the warning's "log out now" intent.
    pub fn confirm_logout(&self) -> Result<(), WatchError> {
        self.send(WatchCommand::ConfirmLogout)
    }

    /// Delivers the warning's "continue" intent.
    pub fn continue_session(&self) -> Result<(), WatchError> {
        self.send(WatchCommand::ContinueSession)
    }

    /// Requests a silent renewal.
    pub fn renew_now(&self) -> Result<(), WatchError> {
        self.send(WatchCommand::RenewNow)
    }

    /// The most recently published status.
    pub fn status(&self) -> WatchStatus {
        *self.status.borrow()
    }

    /// A receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<WatchStatus> {
        self.status.clone()
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, cmd: WatchCommand) -> Result<(), WatchError> {
        self.sender
            .send(cmd)
            .map_err(|_| WatchError::Unavailable(self.watch_id))
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("watch_id", &self.watch_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ActivitySink for WatchHandle {
    fn activity_detected(&self, kind: InteractionKind) {
        if self.activity(kind).is_err() {
            trace!(watch_id = %self.watch_id, "activity after watch stopped, dropped");
        }
    }
}

/// Owns the watch task. Aborts it when dropped.
#[derive(Debug)]
pub struct WatchTask {
    watch_id: WatchId,
    handle: JoinHandle<()>,
}

impl WatchTask {
    /// Stops the watch immediately. Its timers and any in-flight renewal
    /// are dropped with it; no logout is performed.
    pub fn abort(&self) {
        if !self.handle.is_finished() {
            debug!(watch_id = %self.watch_id, "watch aborted");
        }
        self.handle.abort();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for WatchTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The collaborators a watch needs besides its session.
pub struct WatchContext<R, L, P> {
    /// Performs renewals.
    pub renewal: RenewalCoordinator<R>,
    /// Shared at-most-once logout.
    pub logout: LogoutOnce<L>,
    /// Warning view.
    pub presenter: Arc<P>,
    /// Derives the budget from renewed access tokens.
    pub parser: LifetimeParser,
}

/// The internal actor state. Runs inside a Tokio task.
struct WatchActor<R, L, P> {
    session: Session,
    machine: WatchMachine,
    timer: InactivityTimer,
    ticker: CountdownTicker,
    renewal: Option<RenewalTask>,
    ctx: WatchContext<R, L, P>,
    receiver: mpsc::UnboundedReceiver<WatchCommand>,
    status: watch::Sender<WatchStatus>,
}

impl<R, L, P> WatchActor<R, L, P>
where
    R: CredentialRefresher,
    L: LogoutEffect,
    P: WarningPresenter,
{
    /// Runs the actor loop until the session ends or every handle is gone.
    async fn run(mut self) {
        info!(
            budget_ms = self.session.inactivity_budget_ms(),
            "watch started"
        );

        loop {
            // Biased: an intent queued in the same turn as the last tick
            // is applied first.
            let event = tokio::select! {
                biased;
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => cmd.into_event(),
                    None => {
                        debug!("all handles dropped");
                        break;
                    }
                },
                attempt = next_renewal(&mut self.renewal) => self.finish_renewal(attempt),
                at = self.timer.fired() => Event::InactivityTimeout { now: at },
                tick = self.ticker.wait_for_tick() => Event::CountdownTick { now: tick.at },
            };

            let effects = self.machine.handle(event);
            self.apply(effects);
            self.publish();

            if self.machine.phase() == Phase::Terminated {
                break;
            }
        }

        self.timer.cancel();
        self.ticker.stop();
        info!(phase = %self.machine.phase(), "watch stopped");
    }

    fn finish_renewal(&mut self, attempt: RenewalAttempt) -> Event {
        match attempt.result {
            RenewalResult::Success(tokens) => {
                let budget = self
                    .ctx
                    .renewal
                    .commit(&mut self.session, tokens, &self.ctx.parser);
                Event::RenewalSucceeded { budget }
            }
            RenewalResult::Failure(e) => {
                warn!(error = %e, "renewal failed, logging out");
                Event::RenewalFailed
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmInactivityTimer(delay) => {
                    self.timer.arm(delay);
                }
                Effect::CancelInactivityTimer => {
                    self.timer.cancel();
                }
                Effect::StartCountdown => {
                    self.ticker.start();
                }
                Effect::StopCountdown => {
                    self.ticker.stop();
                }
                // Once the session is logged out or retired the view
                // belongs to whoever comes next.
                Effect::ShowWarning { remaining } => {
                    if !self.ctx.logout.has_fired() {
                        self.ctx.presenter.show(remaining);
                    }
                }
                Effect::HideWarning => {
                    if !self.ctx.logout.has_fired() {
                        self.ctx.presenter.hide();
                    }
                }
                Effect::BeginRenewal => {
                    let token = self.session.refresh_token().to_string();
                    self.renewal = Some(self.ctx.renewal.spawn(token));
                }
                Effect::AbortRenewal => {
                    self.renewal = None;
                }
                Effect::Logout(reason) => {
                    self.ctx.logout.fire(reason);
                }
            }
        }
    }

    fn publish(&self) {
        let next = self.machine.status();
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Resolves with the in-flight renewal, or never if there is none.
///
/// Cancel-safe: if the select drops this future the task stays in `slot`.
async fn next_renewal(slot: &mut Option<RenewalTask>) -> RenewalAttempt {
    match slot {
        Some(task) => {
            let attempt = task.await;
            *slot = None;
            attempt
        }
        None => future::pending().await,
    }
}

/// Spawns a watch for `session` and returns a handle plus the owning task.
///
/// The watch starts `Idle`; call [`WatchHandle::activate`] once the session
/// is on a tracked route. Must be called from within a Tokio runtime.
pub fn spawn_watch<R, L, P>(
    watch_id: WatchId,
    session: Session,
    config: &WatchConfig,
    ctx: WatchContext<R, L, P>,
) -> (WatchHandle, WatchTask)
where
    R: CredentialRefresher,
    L: LogoutEffect,
    P: WarningPresenter,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let machine = WatchMachine::new(session.inactivity_budget(), config.warning_lead());
    let (status_tx, status_rx) = watch::channel(machine.status());

    let span = info_span!(
        "watch",
        watch_id = %watch_id,
        user = session.current_user().map(tracing::field::display),
    );

    let actor = WatchActor {
        session,
        machine,
        timer: InactivityTimer::new(),
        ticker: CountdownTicker::new(config.tick_resolution()),
        renewal: None,
        ctx,
        receiver: rx,
        status: status_tx,
    };

    let handle = tokio::spawn(actor.run().instrument(span));

    (
        WatchHandle {
            watch_id,
            sender: tx,
            status: status_rx,
        },
        WatchTask { watch_id, handle },
    )
}
