//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log format (`json` or text).
pub const LOG_FORMAT_ENV: &str = "IDLEGUARD_LOG_FORMAT";

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` (default
/// `info`). Set `IDLEGUARD_LOG_FORMAT=json` for one JSON object per line.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_default();

    match log_format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()
            .is_ok(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok(),
    }
}
