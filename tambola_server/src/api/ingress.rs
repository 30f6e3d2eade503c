//! The IngressAdapter: the WebSocket boundary between wire JSON events and
//! [`GameHandle`] calls.
//!
//! One task per connection. Inbound frames are parsed into [`InboundEvent`],
//! validated only for shape (malformed JSON, unparseable ids), and then
//! handed straight to the matching [`GameHandle`] method, which owns every
//! business rule. A second task per connection drains an outbound channel
//! fed by [`Broadcaster::join`] and a periodic ping, mirroring the
//! reference server's split send/receive halves.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tambola_engine::game::entities::{Category, GameId, PlayerId, UserId};
use tambola_engine::game::{GameError, OutboundEvent};
use tokio::sync::mpsc;

use super::AppState;
use super::rate_limiter::RateLimiter;

const PING_INTERVAL: Duration = Duration::from_secs(15);
const PING_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
pub struct HandshakeParams {
    #[serde(rename = "userId")]
    user_id: String,
}

/// Inbound wire events, matching the protocol verbatim. No auth claim is
/// carried: the socket's `userId` comes from the handshake query string,
/// since verifying it belongs to an external collaborator.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "payload")]
enum InboundEvent {
    #[serde(rename = "game:join")]
    Join {
        #[serde(rename = "gameId")]
        game_id: GameId,
        #[serde(rename = "userName")]
        user_name: Option<String>,
    },
    #[serde(rename = "game:leave")]
    Leave {
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
    #[serde(rename = "game:start")]
    Start {
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
    #[serde(rename = "game:callNumber")]
    CallNumber {
        #[serde(rename = "gameId")]
        game_id: GameId,
        number: u8,
    },
    #[serde(rename = "game:markNumber")]
    MarkNumber {
        #[serde(rename = "gameId")]
        game_id: GameId,
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        number: u8,
    },
    #[serde(rename = "game:claimWin")]
    ClaimWin {
        #[serde(rename = "gameId")]
        game_id: GameId,
        category: Category,
    },
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HandshakeParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Ok(user_id) = params.user_id.parse::<UserId>() else {
        crate::logging::log_security_event("malformed_handshake", None, "userId is not a valid id");
        return axum::http::StatusCode::BAD_REQUEST.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    crate::metrics::socket_connections_total();
    let socket_id = uuid::Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundEvent>(64);
    let last_pong = Arc::new(Mutex::new(Instant::now()));
    let joined_games: Arc<Mutex<HashSet<GameId>>> = Arc::new(Mutex::new(HashSet::new()));

    let send_task = {
        let last_pong = last_pong.clone();
        tokio::spawn(async move {
            let mut ping_interval = tokio::time::interval(PING_INTERVAL);
            ping_interval.tick().await; // first tick fires immediately, skip it
            loop {
                tokio::select! {
                    event = out_rx.recv() => {
                        let Some(event) = event else { break };
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    _ = ping_interval.tick() => {
                        if last_pong.lock().unwrap().elapsed() > PING_TIMEOUT {
                            break;
                        }
                        if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    };

    let mut rate_limiter = RateLimiter::sustained();

    while let Some(frame) = stream.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(_) => break,
        };
        match msg {
            Message::Text(text) => {
                if !rate_limiter.check() {
                    crate::metrics::rate_limit_hits_total("websocket_inbound");
                    let _ = out_tx
                        .send(OutboundEvent::Error {
                            code: "RATE_LIMITED",
                            message: "too many messages, slow down".to_string(),
                        })
                        .await;
                    continue;
                }
                handle_text_frame(&text, &state, user_id, socket_id, &out_tx, &joined_games).await;
            }
            Message::Pong(_) => {
                *last_pong.lock().unwrap() = Instant::now();
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) => {}
        }
    }

    send_task.abort();
    let games: Vec<GameId> = joined_games.lock().unwrap().iter().copied().collect();
    for game_id in games {
        state.broadcaster.leave(game_id, socket_id);
    }
    tracing::debug!(%socket_id, %user_id, "socket disconnected");
}

async fn handle_text_frame(
    text: &str,
    state: &AppState,
    user_id: UserId,
    socket_id: uuid::Uuid,
    out_tx: &mpsc::Sender<OutboundEvent>,
    joined_games: &Arc<Mutex<HashSet<GameId>>>,
) {
    let event: InboundEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            let _ = out_tx
                .send(OutboundEvent::Error {
                    code: "BAD_REQUEST",
                    message: format!("malformed event: {e}"),
                })
                .await;
            return;
        }
    };

    let started = Instant::now();
    let (event_name, game_id, result) = match event {
        InboundEvent::Join { game_id, user_name } => {
            let result = dispatch_join(state, game_id, user_id, user_name, socket_id, out_tx, joined_games).await;
            ("game:join", game_id, result)
        }
        InboundEvent::Leave { game_id } => {
            let result = dispatch_leave(state, game_id, user_id, socket_id, joined_games).await;
            ("game:leave", game_id, result)
        }
        InboundEvent::Start { game_id } => {
            let result = state.registry.get_or_spawn(game_id).await.and_then_async(|h| h.start(user_id)).await;
            ("game:start", game_id, result)
        }
        InboundEvent::CallNumber { game_id, number } => {
            let result = state
                .registry
                .get_or_spawn(game_id)
                .await
                .and_then_async(|h| h.call_number(user_id, number))
                .await;
            state.broadcaster.emit_to(
                game_id,
                socket_id,
                OutboundEvent::CallNumberAck {
                    success: result.is_ok(),
                    error: result.as_ref().err().map(|e| e.to_string()),
                },
            );
            ("game:callNumber", game_id, result)
        }
        InboundEvent::MarkNumber {
            game_id,
            player_id,
            number,
        } => {
            let result = state
                .registry
                .get_or_spawn(game_id)
                .await
                .and_then_async(|h| h.mark_number(user_id, player_id, number))
                .await;
            ("game:markNumber", game_id, result)
        }
        InboundEvent::ClaimWin { game_id, category } => {
            let result = state
                .registry
                .get_or_spawn(game_id)
                .await
                .and_then_async(|h| h.claim_win(user_id, category))
                .await;
            ("game:claimWin", game_id, result)
        }
    };

    let outcome = if result.is_ok() { "ok" } else { "error" };
    crate::logging::log_socket_event(event_name, &game_id.to_string(), &user_id.to_string(), outcome);
    crate::metrics::socket_event_received(event_name);
    crate::metrics::game_operation_duration_ms(event_name, result.is_ok(), started.elapsed().as_secs_f64() * 1000.0);

    if event_name != "game:callNumber" {
        if let Err(e) = result {
            state.broadcaster.emit_to(
                game_id,
                socket_id,
                OutboundEvent::Error {
                    code: e.code(),
                    message: e.to_string(),
                },
            );
        }
    }
}

async fn dispatch_join(
    state: &AppState,
    game_id: GameId,
    user_id: UserId,
    user_name: Option<String>,
    socket_id: uuid::Uuid,
    out_tx: &mpsc::Sender<OutboundEvent>,
    joined_games: &Arc<Mutex<HashSet<GameId>>>,
) -> Result<(), GameError> {
    let handle = state.registry.get_or_spawn(game_id).await?;
    let outcome = handle.join(user_id, user_name).await?;

    state.broadcaster.join(game_id, socket_id, out_tx.clone()).await;
    joined_games.lock().unwrap().insert(game_id);

    let (player_id, ticket) = match outcome {
        tambola_engine::game::entities::JoinOutcome::Observer => (None, None),
        tambola_engine::game::entities::JoinOutcome::Player(player) => (Some(player.id), Some(player.ticket)),
    };
    let _ = out_tx
        .send(OutboundEvent::Joined {
            game_id,
            player_id,
            ticket,
        })
        .await;

    let state_sync = handle.get_state_sync(user_id).await?;
    let _ = out_tx.send(OutboundEvent::StateSync(state_sync)).await;
    Ok(())
}

async fn dispatch_leave(
    state: &AppState,
    game_id: GameId,
    user_id: UserId,
    socket_id: uuid::Uuid,
    joined_games: &Arc<Mutex<HashSet<GameId>>>,
) -> Result<(), GameError> {
    let handle = state.registry.get_or_spawn(game_id).await?;
    handle.leave(user_id).await?;
    state.broadcaster.leave(game_id, socket_id);
    joined_games.lock().unwrap().remove(&game_id);
    Ok(())
}

/// Lets `get_or_spawn(..).await.and_then_async(|h| h.method(..)).await` read
/// as one pipeline instead of a nested `match` at every call site.
trait ResultExt<T> {
    async fn and_then_async<F, Fut, U>(self, f: F) -> Result<U, GameError>
    where
        F: FnOnce(T) -> Fut,
        Fut: std::future::Future<Output = Result<U, GameError>>;
}

impl<T> ResultExt<T> for Result<T, GameError> {
    async fn and_then_async<F, Fut, U>(self, f: F) -> Result<U, GameError>
    where
        F: FnOnce(T) -> Fut,
        Fut: std::future::Future<Output = Result<U, GameError>>,
    {
        match self {
            Ok(value) => f(value).await,
            Err(e) => Err(e),
        }
    }
}
