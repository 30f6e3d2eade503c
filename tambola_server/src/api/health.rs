//! Liveness and readiness probes for load balancers and orchestrators.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use super::AppState;

/// `GET /health` — the process is up and answering requests. Never checks
/// downstream dependencies; that's `/ready`'s job.
pub async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// `GET /ready` — the process can actually serve traffic: the durable
/// store and hot state are both reachable.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = state.db.health_check().await.is_ok();
    let hot_healthy = state.hot.read_state(uuid::Uuid::nil()).await.is_ok();
    let overall = db_healthy && hot_healthy;

    let body = json!({
        "status": if overall { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "hotState": hot_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let status = if overall { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}
