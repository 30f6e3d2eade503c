//! HTTP/WebSocket surface for the Tambola server.
//!
//! # Architecture
//!
//! - **Axum**: async web framework for HTTP/WebSocket
//! - **Tower**: middleware for CORS and request correlation
//! - **Actor model**: each game's state is owned by a dedicated actor task,
//!   reached only through [`tambola_engine::GameRegistry`]
//!
//! # Modules
//!
//! - [`ingress`]: the WebSocket boundary (`game:*` events in, `game:*`/
//!   `error` events out)
//! - [`health`]: `/health` liveness and `/ready` readiness probes
//! - [`rate_limiter`] / [`request_id`]: per-connection throttling and
//!   request correlation, unrelated to game semantics
//!
//! Authentication is deliberately absent here: the handshake's `userId` is
//! trusted as-is, verifying it belongs to an external collaborator.

pub mod health;
pub mod ingress;
pub mod rate_limiter;
pub mod request_id;

use axum::{Router, routing::get};
use std::sync::Arc;
use tambola_engine::broadcast::Broadcaster;
use tambola_engine::db::Database;
use tambola_engine::game::GameRegistry;
use tambola_engine::hotstate::HotState;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Application state shared across every HTTP and WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub db: Database,
    pub hot: Arc<dyn HotState>,
}

/// Build the complete router: health probes, the WebSocket endpoint, and
/// the request-id/CORS middleware stack.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    Router::new()
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/ws", get(ingress::websocket_handler))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
