//! `SessionSupervisor` builder and lifecycle.
//!
//! The supervisor is the only idleguard object a host talks to. It owns at
//! most one (session, watch) pair at a time and routes login, logout,
//! navigation, interaction and warning intents to it.

use std::sync::Arc;

use idleguard_activity::{
    ActivitySource, ExemptRoutes, InteractionKind, RouteChange, RouteClassifier,
};
use idleguard_session::{
    CredentialRefresher, LogoutEffect, LogoutOnce, LogoutReason, RenewalCoordinator, Session,
    UserId,
};
use idleguard_watch::{
    Phase, WarningPresenter, WatchContext, WatchError, WatchHandle, WatchId, WatchStatus,
    WatchTask, spawn_watch,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::SupervisorConfig;

/// Errors returned by supervisor intents.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The intent needs a logged-in session and there is none.
    #[error("no active session")]
    NoActiveSession,

    /// `on_login` was given a session without a user.
    #[error("session has no current user")]
    MissingUser,
}

/// The live (session, watch) pair. The session itself lives in the watch
/// task; the supervisor keeps the handles needed to reach and stop it.
struct ActivePair<L> {
    user: UserId,
    handle: WatchHandle,
    task: WatchTask,
    logout: LogoutOnce<L>,
}

/// Builder for a [`SessionSupervisor`].
///
/// # Example
///
/// ```rust,ignore
/// use idleguard::prelude::*;
///
/// let mut supervisor = SessionSupervisor::builder()
///     .config(SupervisorConfig::from_json_file("idleguard.json")?)
///     .build(MyRefresher, MyLogout, MyDialog);
/// supervisor.on_route_change("/dashboard");
/// supervisor.on_login(session)?;
/// ```
#[derive(Debug, Default)]
pub struct SessionSupervisorBuilder {
    config: SupervisorConfig,
}

impl SessionSupervisorBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets where logout navigates to.
    pub fn logout_redirect(mut self, redirect: &str) -> Self {
        self.config.logout_redirect = redirect.to_string();
        self
    }

    /// Builds a supervisor that classifies routes with the configured
    /// exempt allow-list.
    pub fn build<R, L, P>(
        self,
        refresher: R,
        logout: L,
        presenter: P,
    ) -> SessionSupervisor<R, L, P, ExemptRoutes>
    where
        R: CredentialRefresher,
        L: LogoutEffect,
        P: WarningPresenter,
    {
        let routes = self.config.exempt_routes.clone();
        self.build_with_classifier(refresher, logout, presenter, routes)
    }

    /// Builds a supervisor with a custom route classifier. The configured
    /// `exempt_routes` are ignored.
    pub fn build_with_classifier<R, L, P, C>(
        self,
        refresher: R,
        logout: L,
        presenter: P,
        classifier: C,
    ) -> SessionSupervisor<R, L, P, C>
    where
        R: CredentialRefresher,
        L: LogoutEffect,
        P: WarningPresenter,
        C: RouteClassifier,
    {
        SessionSupervisor {
            config: self.config.validated(),
            renewal: RenewalCoordinator::new(Arc::new(refresher)),
            logout: Arc::new(logout),
            presenter: Arc::new(presenter),
            activity: ActivitySource::new(classifier),
            active: None,
        }
    }
}

/// Owns the session lifecycle for one host.
///
/// Not a global: create one, keep it for the life of the app, and drop it
/// on shutdown (which stops any running watch without logging out).
///
/// Methods that start a watch must be called from within a Tokio runtime.
pub struct SessionSupervisor<R, L, P, C = ExemptRoutes> {
    config: SupervisorConfig,
    renewal: RenewalCoordinator<R>,
    logout: Arc<L>,
    presenter: Arc<P>,
    activity: ActivitySource<C, WatchHandle>,
    active: Option<ActivePair<L>>,
}

impl SessionSupervisor<(), (), (), ExemptRoutes> {
    /// Creates a new builder.
    pub fn builder() -> SessionSupervisorBuilder {
        SessionSupervisorBuilder::new()
    }
}

impl<R, L, P, C> SessionSupervisor<R, L, P, C>
where
    R: CredentialRefresher,
    L: LogoutEffect,
    P: WarningPresenter,
    C: RouteClassifier,
{
    /// Starts supervising a freshly authenticated (or rehydrated) session.
    ///
    /// Any prior pair is discarded first, without a logout. Monitoring
    /// starts right away unless the current route is exempt, in which case
    /// the watch waits in `Idle` for the first tracked route.
    pub fn on_login(&mut self, session: Session) -> Result<WatchId, SupervisorError> {
        let user = session
            .current_user()
            .cloned()
            .ok_or(SupervisorError::MissingUser)?;
        self.discard("replaced by new login");

        let watch_id = WatchId::next();
        let logout = LogoutOnce::new(Arc::clone(&self.logout), &self.config.logout_redirect);
        let budget_ms = session.inactivity_budget_ms();
        let ctx = WatchContext {
            renewal: self.renewal.clone(),
            logout: logout.clone(),
            presenter: Arc::clone(&self.presenter),
            parser: self.config.token.clone(),
        };
        let (handle, task) = spawn_watch(watch_id, session, &self.config.watch, ctx);

        self.activity.attach(handle.clone());
        if self.activity.is_tracking() {
            // Cannot fail: the task was spawned just above.
            let _ = handle.activate();
        } else {
            debug!(%watch_id, "login on exempt route, watch idle");
        }
        info!(%watch_id, %user, budget_ms, "session started");

        self.active = Some(ActivePair {
            user,
            handle,
            task,
            logout,
        });
        Ok(watch_id)
    }

    /// Ends the session: performs the logout (at most once per session),
    /// stops the watch and cancels every timer.
    ///
    /// Idempotent. Returns `true` if this call performed the logout; a
    /// session the watch already logged out is only torn down.
    pub fn on_logout(&mut self) -> bool {
        let Some(pair) = self.active.take() else {
            debug!("logout without an active session");
            return false;
        };

        let performed = pair.logout.fire(LogoutReason::UserRequested);
        self.teardown(pair);
        performed
    }

    /// Tells the supervisor the host navigated to `path`.
    ///
    /// Entering a tracked route starts monitoring for an idle watch.
    pub fn on_route_change(&mut self, path: &str) -> RouteChange {
        let change = self.activity.set_route(path);
        if change == RouteChange::StartedTracking {
            if let Some(pair) = &self.active {
                if pair.handle.activate().is_err() {
                    debug!(watch_id = %pair.handle.watch_id(), "watch already stopped");
                }
            }
        }
        change
    }

    /// Reports a raw user interaction. Returns `true` if it was forwarded
    /// as activity (tracked route, tracked kind, live session).
    pub fn record_interaction(&mut self, kind: InteractionKind) -> bool {
        self.activity.record(kind)
    }

    /// The warning's "log out now" button.
    pub fn confirm_logout(&self) -> Result<(), SupervisorError> {
        self.signal(WatchHandle::confirm_logout)
    }

    /// The warning's "continue" button.
    pub fn continue_session(&self) -> Result<(), SupervisorError> {
        self.signal(WatchHandle::continue_session)
    }

    /// Renews the credentials without waiting for the warning.
    pub fn renew_now(&self) -> Result<(), SupervisorError> {
        self.signal(WatchHandle::renew_now)
    }

    /// The current watch status, if a session exists.
    pub fn status(&self) -> Option<WatchStatus> {
        self.active.as_ref().map(|pair| pair.handle.status())
    }

    /// A receiver notified whenever the current watch's status changes.
    pub fn subscribe(&self) -> Option<watch::Receiver<WatchStatus>> {
        self.active.as_ref().map(|pair| pair.handle.subscribe())
    }

    /// Whether a session is logged in and not yet logged out.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|pair| !pair.handle.status().phase.is_terminal())
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<&UserId> {
        self.active.as_ref().map(|pair| &pair.user)
    }

    /// The effective configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    fn signal(
        &self,
        send: impl FnOnce(&WatchHandle) -> Result<(), WatchError>,
    ) -> Result<(), SupervisorError> {
        let pair = self.active.as_ref().ok_or(SupervisorError::NoActiveSession)?;
        if let Err(e) = send(&pair.handle) {
            // The watch already ended the session; the click arrived late.
            debug!(error = %e, "intent after watch stopped, ignored");
        }
        Ok(())
    }

    fn discard(&mut self, why: &str) {
        if let Some(pair) = self.active.take() {
            debug!(watch_id = %pair.handle.watch_id(), why, "discarding session");
            self.teardown(pair);
        }
    }

    fn teardown(&mut self, pair: ActivePair<L>) {
        let was_warning = pair.handle.status().phase == Phase::Warning;
        // Abort is not synchronous on a multi-thread runtime; the latch
        // stops a watch mid-step from logging out or redrawing the warning.
        pair.logout.retire();
        pair.task.abort();
        self.activity.detach();
        if was_warning {
            self.presenter.hide();
        }
        info!(watch_id = %pair.handle.watch_id(), user = %pair.user, "session ended");
    }
}
