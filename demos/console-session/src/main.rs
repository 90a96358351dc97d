use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use idleguard::prelude::*;
use tracing::info;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Mints an unsigned token whose payload declares `minutes` of lifetime.
fn mint(minutes: u64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "lifetime": minutes }).to_string());
    format!("eyJhbGciOiJub25lIn0.{payload}.demo")
}

/// Pretends to call the auth server.
struct ConsoleRefresher;

impl CredentialRefresher for ConsoleRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        info!(refresh_token_len = refresh_token.len(), "POST /auth/refresh");
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(TokenPair::new(mint(1), format!("{refresh_token}'")))
    }
}

struct ConsoleLogout;

impl LogoutEffect for ConsoleLogout {
    fn perform_logout(&self, redirect: &str, reason: LogoutReason) {
        info!(%reason, "tokens cleared, navigating to {redirect}");
    }
}

/// Prints the countdown once per whole second.
#[derive(Default)]
struct ConsoleDialog {
    last_second: Mutex<Option<u64>>,
}

impl WarningPresenter for ConsoleDialog {
    fn show(&self, remaining: Duration) {
        let second = remaining.as_secs();
        let mut last = self.last_second.lock().unwrap_or_else(|e| e.into_inner());
        if *last != Some(second) {
            *last = Some(second);
            info!("[dialog] you will be logged out in {second}s  [continue] [log out now]");
        }
    }

    fn hide(&self) {
        *self.last_second.lock().unwrap_or_else(|e| e.into_inner()) = None;
        info!("[dialog] closed");
    }
}

// ---------------------------------------------------------------------------
// Scripted session
// ---------------------------------------------------------------------------

async fn wait_for_phase(
    supervisor: &SessionSupervisor<ConsoleRefresher, ConsoleLogout, ConsoleDialog>,
    phase: Phase,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = supervisor.subscribe().ok_or(SupervisorError::NoActiveSession)?;
    rx.wait_for(|s| s.phase == phase).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    idleguard::telemetry::init();

    // Short lead so the demo finishes in seconds; pass a JSON file to
    // override.
    let config = match std::env::args().nth(1) {
        Some(path) => SupervisorConfig::from_json_file(path)?,
        None => SupervisorConfig::from_json_str(
            &serde_json::json!({ "watch": { "warning_lead_ms": 3000 } }).to_string(),
        )?,
    };
    info!(config = %serde_json::to_string(&config)?, "starting");

    let mut supervisor = SessionSupervisor::builder().config(config).build(
        ConsoleRefresher,
        ConsoleLogout,
        ConsoleDialog::default(),
    );

    // Signed in from the login page: nothing is timed yet.
    supervisor.on_route_change("/login");
    supervisor.on_login(Session::with_budget(
        Some(UserId::from("demo")),
        TokenPair::new(mint(1), "refresh-0"),
        Duration::from_secs(8),
    ))?;
    supervisor.on_route_change("/dashboard");

    tokio::time::sleep(Duration::from_secs(2)).await;
    supervisor.record_interaction(InteractionKind::Pointer);

    // Idle until the warning opens, then answer it halfway through.
    wait_for_phase(&supervisor, Phase::Warning).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    supervisor.continue_session()?;

    let mut rx = supervisor.subscribe().ok_or(SupervisorError::NoActiveSession)?;
    let status = *rx
        .wait_for(|s| s.phase == Phase::Monitoring && !s.renewal_in_flight)
        .await?;
    info!(budget_s = status.budget.as_secs(), "renewed");

    tokio::time::sleep(Duration::from_secs(2)).await;
    supervisor.on_logout();
    supervisor.on_logout();

    Ok(())
}
