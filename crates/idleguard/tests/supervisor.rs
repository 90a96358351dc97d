//! End-to-end tests for the session supervisor on a paused clock.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use idleguard::prelude::*;
use idleguard::{SessionSupervisorBuilder, WatchConfig};
use tokio::time::{self, Instant};

fn access_token(minutes: u64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"lifetime":{minutes}}}"#));
    format!("eyJhbGciOiJub25lIn0.{payload}.sig")
}

fn session(user: &str, minutes: u64) -> Session {
    Session::new(
        Some(UserId::from(user)),
        TokenPair::new(access_token(minutes), format!("refresh-{user}")),
        &LifetimeParser::default(),
    )
}

// =========================================================================
// Collaborators (shared through Arc so the test can inspect them)
// =========================================================================

#[derive(Default)]
struct Calls {
    logouts: Mutex<Vec<(String, LogoutReason)>>,
    refreshes: Mutex<Vec<String>>,
    warning_visible: Mutex<bool>,
}

impl Calls {
    fn logouts(&self) -> Vec<(String, LogoutReason)> {
        self.logouts.lock().unwrap().clone()
    }

    fn warning_visible(&self) -> bool {
        *self.warning_visible.lock().unwrap()
    }
}

struct Refresher(Arc<Calls>);

impl CredentialRefresher for Refresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        self.0.refreshes.lock().unwrap().push(refresh_token.to_string());
        time::sleep(Duration::from_millis(500)).await;
        Ok(TokenPair::new(access_token(5), "rotated"))
    }
}

struct Logout(Arc<Calls>);

impl LogoutEffect for Logout {
    fn perform_logout(&self, redirect: &str, reason: LogoutReason) {
        self.0.logouts.lock().unwrap().push((redirect.to_string(), reason));
    }
}

struct Dialog(Arc<Calls>);

impl WarningPresenter for Dialog {
    fn show(&self, _remaining: Duration) {
        *self.0.warning_visible.lock().unwrap() = true;
    }

    fn hide(&self) {
        *self.0.warning_visible.lock().unwrap() = false;
    }
}

type Supervisor = SessionSupervisor<Refresher, Logout, Dialog>;

fn supervisor() -> (Supervisor, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let supervisor = SessionSupervisor::builder().build(
        Refresher(Arc::clone(&calls)),
        Logout(Arc::clone(&calls)),
        Dialog(Arc::clone(&calls)),
    );
    (supervisor, calls)
}

async fn wait_for(supervisor: &Supervisor, pred: impl FnMut(&WatchStatus) -> bool) -> WatchStatus {
    let mut rx = supervisor.subscribe().expect("no active session");
    let status = *rx.wait_for(pred).await.expect("watch dropped its status");
    status
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_login_on_tracked_route_starts_monitoring() {
    let (mut sup, _calls) = supervisor();
    sup.on_route_change("/dashboard");

    sup.on_login(session("alice", 5)).unwrap();
    let status = wait_for(&sup, |s| s.phase == Phase::Monitoring).await;

    assert!(sup.is_active());
    assert_eq!(status.budget, Duration::from_secs(300));
    assert_eq!(sup.current_user(), Some(&UserId::from("alice")));
}

#[tokio::test(start_paused = true)]
async fn test_login_on_exempt_route_waits_for_tracked_route() {
    let (mut sup, calls) = supervisor();
    sup.on_route_change("/login");
    sup.on_login(session("alice", 5)).unwrap();

    time::sleep(Duration::from_secs(3_600)).await;
    assert_eq!(sup.status().map(|s| s.phase), Some(Phase::Idle));
    assert!(!calls.warning_visible());

    assert_eq!(sup.on_route_change("/projects/7"), RouteChange::StartedTracking);
    let tracked_at = Instant::now();
    wait_for(&sup, |s| s.phase == Phase::Warning).await;

    // A full budget from the first tracked route, not from login.
    assert_eq!(Instant::now() - tracked_at, Duration::from_secs(240));
    assert!(calls.warning_visible());
}

#[tokio::test(start_paused = true)]
async fn test_login_without_user_is_rejected() {
    let (mut sup, _calls) = supervisor();
    let anonymous = Session::with_budget(None, TokenPair::new("a", "r"), Duration::from_secs(300));

    let err = sup.on_login(anonymous).unwrap_err();

    assert!(matches!(err, SupervisorError::MissingUser));
    assert!(!sup.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_new_login_discards_prior_pair_without_logout() {
    let (mut sup, calls) = supervisor();
    sup.on_route_change("/dashboard");
    let first = sup.on_login(session("alice", 5)).unwrap();
    let mut old_status = sup.subscribe().unwrap();

    let second = sup.on_login(session("bob", 10)).unwrap();

    assert_ne!(first, second);
    assert!(old_status.changed().await.is_err(), "old watch must be gone");
    assert_eq!(sup.current_user(), Some(&UserId::from("bob")));
    assert!(calls.logouts().is_empty());

    // Only the new watch is timing: no warning at alice's 240 s mark.
    time::sleep(Duration::from_secs(300)).await;
    assert_eq!(sup.status().map(|s| s.phase), Some(Phase::Monitoring));
    assert_eq!(sup.status().map(|s| s.budget), Some(Duration::from_secs(600)));
}

// =========================================================================
// Logout
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_logout_twice_performs_one_logout() {
    let (mut sup, calls) = supervisor();
    sup.on_route_change("/dashboard");
    sup.on_login(session("alice", 5)).unwrap();
    wait_for(&sup, |s| s.phase == Phase::Warning).await;

    assert!(sup.on_logout());
    assert!(!sup.on_logout());

    assert_eq!(
        calls.logouts(),
        vec![("/login".to_string(), LogoutReason::UserRequested)]
    );
    assert!(!sup.is_active());
    assert!(!calls.warning_visible(), "teardown hides an open warning");

    // No timer survives the teardown.
    time::sleep(Duration::from_secs(600)).await;
    assert_eq!(calls.logouts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_without_session_is_noop() {
    let (mut sup, calls) = supervisor();

    assert!(!sup.on_logout());
    assert!(calls.logouts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_forced_logout_then_explicit_logout_performs_once() {
    let (mut sup, calls) = supervisor();
    sup.on_route_change("/dashboard");
    sup.on_login(session("alice", 5)).unwrap();

    wait_for(&sup, |s| s.phase == Phase::Terminated).await;
    assert!(!sup.is_active());

    assert!(!sup.on_logout(), "watch already logged out");
    assert_eq!(
        calls.logouts(),
        vec![("/login".to_string(), LogoutReason::InactivityTimeout)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_redirect_reaches_logout_effect() {
    let calls = Arc::new(Calls::default());
    let mut sup = SessionSupervisorBuilder::new()
        .logout_redirect("/goodbye")
        .build(
            Refresher(Arc::clone(&calls)),
            Logout(Arc::clone(&calls)),
            Dialog(Arc::clone(&calls)),
        );
    sup.on_route_change("/dashboard");
    sup.on_login(session("alice", 5)).unwrap();

    sup.on_logout();

    assert_eq!(calls.logouts()[0].0, "/goodbye");
}

// =========================================================================
// Intents and activity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_intents_without_session_are_errors() {
    let (sup, _calls) = supervisor();

    assert!(matches!(sup.confirm_logout(), Err(SupervisorError::NoActiveSession)));
    assert!(matches!(sup.continue_session(), Err(SupervisorError::NoActiveSession)));
    assert!(matches!(sup.renew_now(), Err(SupervisorError::NoActiveSession)));
    assert!(sup.status().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_interactions_only_count_on_tracked_routes() {
    let (mut sup, _calls) = supervisor();
    sup.on_route_change("/signup");
    sup.on_login(session("alice", 5)).unwrap();

    assert!(!sup.record_interaction(InteractionKind::Key));

    sup.on_route_change("/dashboard");
    assert!(sup.record_interaction(InteractionKind::Key));
    assert!(!sup.record_interaction(InteractionKind::Resize));
}

#[tokio::test(start_paused = true)]
async fn test_interaction_defers_warning() {
    let (mut sup, _calls) = supervisor();
    sup.on_route_change("/dashboard");
    sup.on_login(session("alice", 5)).unwrap();

    time::sleep(Duration::from_secs(230)).await;
    sup.record_interaction(InteractionKind::Scroll);
    let last = Instant::now();
    wait_for(&sup, |s| s.phase == Phase::Warning).await;

    assert_eq!(Instant::now() - last, Duration::from_secs(240));
}

#[tokio::test(start_paused = true)]
async fn test_confirm_logout_from_warning() {
    let (mut sup, calls) = supervisor();
    sup.on_route_change("/dashboard");
    sup.on_login(session("alice", 5)).unwrap();
    wait_for(&sup, |s| s.phase == Phase::Warning).await;

    sup.confirm_logout().unwrap();
    wait_for(&sup, |s| s.phase == Phase::Terminated).await;

    assert_eq!(
        calls.logouts(),
        vec![("/login".to_string(), LogoutReason::UserConfirmed)]
    );
    assert!(!calls.warning_visible());
    // A second click after the watch stopped is ignored.
    time::sleep(Duration::from_millis(10)).await;
    assert!(sup.confirm_logout().is_ok());
    assert_eq!(calls.logouts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_continue_renews_with_session_refresh_token() {
    let (mut sup, calls) = supervisor();
    sup.on_route_change("/dashboard");
    sup.on_login(session("alice", 5)).unwrap();
    wait_for(&sup, |s| s.phase == Phase::Warning).await;

    time::sleep(Duration::from_secs(15)).await;
    sup.continue_session().unwrap();
    let resumed = wait_for(&sup, |s| s.phase == Phase::Monitoring && !s.renewal_in_flight).await;

    assert_eq!(resumed.budget, Duration::from_secs(300));
    assert_eq!(*calls.refreshes.lock().unwrap(), vec!["refresh-alice".to_string()]);
    assert!(calls.logouts().is_empty());
    assert!(!calls.warning_visible());
}

#[tokio::test(start_paused = true)]
async fn test_configured_warning_lead_is_used() {
    let calls = Arc::new(Calls::default());
    let config = SupervisorConfig {
        watch: WatchConfig {
            warning_lead_ms: 120_000,
            ..WatchConfig::default()
        },
        ..SupervisorConfig::default()
    };
    let mut sup = SessionSupervisor::builder().config(config).build(
        Refresher(Arc::clone(&calls)),
        Logout(Arc::clone(&calls)),
        Dialog(Arc::clone(&calls)),
    );
    sup.on_route_change("/dashboard");
    let start = Instant::now();
    sup.on_login(session("alice", 5)).unwrap();

    let warning = wait_for(&sup, |s| s.phase == Phase::Warning).await;

    assert_eq!(Instant::now() - start, Duration::from_secs(180));
    assert_eq!(warning.countdown_remaining, Some(Duration::from_secs(120)));
}

// =========================================================================
// Replacing a session on a multi-thread runtime
// =========================================================================

/// A dialog whose first `hide` parks the watch task until the test lets it
/// go, holding the old watch in the middle of its final step.
struct StallingDialog {
    calls: Arc<Calls>,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl WarningPresenter for StallingDialog {
    fn show(&self, _remaining: Duration) {
        *self.calls.warning_visible.lock().unwrap() = true;
    }

    fn hide(&self) {
        let entered = self.entered.lock().unwrap().take();
        if let Some(entered) = entered {
            let _ = entered.send(());
            if let Some(release) = self.release.lock().unwrap().take() {
                let _ = release.recv();
            }
        }
        *self.calls.warning_visible.lock().unwrap() = false;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replaced_watch_mid_step_cannot_log_out_new_session() {
    let calls = Arc::new(Calls::default());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let config = SupervisorConfig {
        watch: WatchConfig {
            warning_lead_ms: 100,
            tick_resolution_ms: 10,
        },
        ..SupervisorConfig::default()
    };
    let mut sup = SessionSupervisor::builder().config(config).build(
        Refresher(Arc::clone(&calls)),
        Logout(Arc::clone(&calls)),
        StallingDialog {
            calls: Arc::clone(&calls),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        },
    );
    sup.on_route_change("/dashboard");
    let alice = Session::with_budget(
        Some(UserId::from("alice")),
        TokenPair::new("a", "r"),
        Duration::from_millis(150),
    );
    sup.on_login(alice).unwrap();

    // Alice's countdown runs out; her watch is now inside its final step.
    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();

    sup.on_login(session("bob", 5)).unwrap();
    release_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(calls.logouts().is_empty(), "old watch logged out the new session");
    assert!(sup.is_active());
    assert_eq!(sup.current_user(), Some(&UserId::from("bob")));
}
