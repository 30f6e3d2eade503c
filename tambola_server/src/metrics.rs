//! Prometheus metrics for monitoring server health and performance.
//!
//! Metrics are exposed in Prometheus text format for scraping, mirroring the
//! categories (HTTP, WebSocket, game, database) the reference service
//! tracks, adapted to this domain's operations.

#![allow(dead_code)]

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter at `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

/// Set the current number of open WebSocket connections.
pub fn socket_connections_active(count: u64) {
    metrics::gauge!("socket_connections_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn socket_connections_total() {
    metrics::counter!("socket_connections_total").increment(1);
}

/// Record an inbound socket event by its wire event name.
pub fn socket_event_received(event: &str) {
    metrics::counter!("socket_events_received_total", "event" => event.to_string()).increment(1);
}

/// Record a GameEngine operation's latency and outcome.
pub fn game_operation_duration_ms(operation: &str, success: bool, duration_ms: f64) {
    metrics::histogram!("game_operation_duration_ms",
        "operation" => operation.to_string(),
        "success" => success.to_string()
    )
    .record(duration_ms);
}

/// Set the current number of active (non-terminal) games.
pub fn active_games(count: i64) {
    metrics::gauge!("active_games").set(count as f64);
}

/// Record a PrizeQueue attempt outcome.
pub fn prize_attempt_total(outcome: &str) {
    metrics::counter!("prize_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record HotState call latency.
pub fn hot_state_call_duration_ms(operation: &str, duration_ms: f64) {
    metrics::histogram!("hot_state_call_duration_ms", "operation" => operation.to_string()).record(duration_ms);
}

/// Record DurableStore call latency.
pub fn durable_store_call_duration_ms(operation: &str, duration_ms: f64) {
    metrics::histogram!("durable_store_call_duration_ms", "operation" => operation.to_string()).record(duration_ms);
}

/// Increment rate limit hits counter.
pub fn rate_limit_hits_total(event: &str) {
    metrics::counter!("rate_limit_hits_total", "event" => event.to_string()).increment(1);
}
