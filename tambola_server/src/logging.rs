//! Structured logging configuration.
//!
//! `tambola_engine` logs through the lighter-weight `log` facade so it stays
//! usable from contexts that haven't initialized `tracing`; `tracing-log`
//! bridges those records into the same subscriber this module installs.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the process-wide tracing subscriber.
///
/// # Example
///
/// ```no_run
/// tambola_server::logging::init();
/// tracing::info!("server starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing_log::LogTracer::init().expect("only one LogTracer is installed per process");

    tracing::info!("structured logging initialized");
}

/// Log a security-relevant event (e.g. a handshake with a malformed userId).
#[allow(dead_code)]
pub fn log_security_event(event_type: &str, user_id: Option<&str>, message: &str) {
    tracing::warn!(event_type = event_type, user_id = user_id, "SECURITY: {}", message);
}

/// Log a slow operation, warning above `threshold_ms`.
pub fn log_slow_operation(operation: &str, duration_ms: u64, threshold_ms: u64) {
    if duration_ms > threshold_ms {
        tracing::warn!(operation = operation, duration_ms = duration_ms, "slow operation");
    } else {
        tracing::debug!(operation = operation, duration_ms = duration_ms, "operation completed");
    }
}

/// Log a completed inbound socket event.
pub fn log_socket_event(event: &str, game_id: &str, user_id: &str, outcome: &str) {
    tracing::info!(event = event, game_id = game_id, user_id = user_id, outcome = outcome, "socket event handled");
}
