//! Realtime 90-ball Tambola server.
//!
//! Wires the durable store, hot state, cross-instance pub/sub, the prize
//! payout pipeline, and the per-game actor registry together, then serves
//! the WebSocket ingress over HTTP.

use std::sync::Arc;

use anyhow::Context;
use ctrlc::set_handler;
use pico_args::Arguments;
use tambola_engine::broadcast::{Broadcaster, RedisPubSub};
use tambola_engine::db::{Database, DurableStore};
use tambola_engine::game::GameRegistry;
use tambola_engine::hotstate::{HotState, RedisHotState};
use tambola_engine::prize_queue::{HttpPayoutClient, PrizeQueueManager};

use tambola_server::config::ServerConfig;
use tambola_server::{api, logging, metrics};

const HELP: &str = "\
Run the Tambola game server

USAGE:
  tambola_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 0.0.0.0:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  REDIS_URL                Redis connection string (hot state + pub/sub)
  JWT_SECRET               Passed through to the external auth collaborator
  PAYOUT_API_BASE_URL      External prize payout API base URL
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override = pargs.value_from_str("--bind").ok();
    let db_url_override = pargs.value_from_str("--db-url").ok();

    logging::init();
    set_handler(|| std::process::exit(0)).context("failed to install signal handler")?;

    let config = ServerConfig::from_env(bind_override, db_url_override).context("loading configuration")?;
    config.validate().context("validating configuration")?;

    tracing::info!(bind = %config.bind, "starting tambola_server");

    let db = Database::connect(&config.database)
        .await
        .context("connecting to the durable store")?;
    tracing::info!("durable store connected");

    let hot: Arc<dyn HotState> = Arc::new(
        RedisHotState::connect(&config.redis_url)
            .await
            .context("connecting hot state to redis")?,
    );
    tracing::info!("hot state connected");

    let pubsub = Arc::new(RedisPubSub::new(&config.redis_url).context("connecting pub/sub to redis")?);
    let broadcaster = Arc::new(Broadcaster::new(pubsub));

    let payout_client = Arc::new(HttpPayoutClient::new(config.payout.base_url.clone()));
    let store: Arc<dyn DurableStore> = Arc::new(db.store());
    let prize_queue = Arc::new(PrizeQueueManager::new(store.clone(), payout_client));
    tokio::spawn(prize_queue.clone().run_retry_loop());

    let registry = Arc::new(GameRegistry::new(hot.clone(), store, prize_queue, broadcaster.clone()));

    metrics::init_metrics(([0, 0, 0, 0], 9100).into())
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing metrics exporter")?;

    let state = api::AppState {
        registry,
        broadcaster,
        db,
        hot,
    };
    let app = api::create_router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding to {}", config.bind))?;

    tracing::info!("listening on {}, press Ctrl+C to stop", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install CTRL+C signal handler");
}
