//! # idleguard
//!
//! Session inactivity supervision for Tokio applications.
//!
//! idleguard tracks how long an authenticated session may stay idle, warns
//! the user shortly before forcing a logout, races that warning against the
//! user's answer and fresh activity, and renews credentials silently. The
//! host supplies three collaborators and talks to a single
//! [`SessionSupervisor`]:
//!
//! - [`CredentialRefresher`] exchanges a refresh token for a new pair
//! - [`LogoutEffect`] clears auth state and navigates away
//! - [`WarningPresenter`] shows and hides the countdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use idleguard::prelude::*;
//!
//! // Implement the three collaborator traits for your app, then:
//! // let mut supervisor = SessionSupervisor::builder()
//! //     .config(SupervisorConfig::default())
//! //     .build(refresher, logout, presenter);
//! // supervisor.on_route_change("/dashboard");
//! // supervisor.on_login(Session::new(Some(user), tokens, &parser))?;
//! ```

mod config;
mod error;
mod supervisor;
pub mod telemetry;

pub use config::{ConfigError, DEFAULT_LOGOUT_REDIRECT, SupervisorConfig};
pub use error::IdleguardError;
pub use supervisor::{SessionSupervisor, SessionSupervisorBuilder, SupervisorError};

pub use idleguard_activity::{
    ActivitySink, ExemptRoutes, InteractionKind, RouteChange, RouteClassifier,
};
pub use idleguard_session::{
    CredentialRefresher, LogoutEffect, LogoutReason, Session, SessionError, TokenPair, UserId,
};
pub use idleguard_token::{LifetimeParser, TokenError};
pub use idleguard_watch::{Phase, WarningPresenter, WatchConfig, WatchError, WatchId, WatchStatus};

pub mod prelude {
    //! Everything a host needs to wire idleguard in.

    pub use crate::{
        CredentialRefresher, ExemptRoutes, IdleguardError, InteractionKind, LifetimeParser,
        LogoutEffect, LogoutReason, Phase, RouteChange, RouteClassifier, Session, SessionError,
        SessionSupervisor, SupervisorConfig, SupervisorError, TokenPair, UserId, WarningPresenter,
        WatchStatus,
    };
}
