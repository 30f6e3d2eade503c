//! Game actor inbox/outbox types.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::entities::{Category, GameId, JoinOutcome, StateSync, UserId};
use super::errors::GameResult;

/// Messages accepted by a [`super::actor::GameActor`]'s inbox. Each variant
/// that expects a reply carries its own `oneshot::Sender` rather than a
/// shared response enum, since each operation's success payload has a
/// different shape.
#[derive(Debug)]
pub enum GameMessage {
    Join {
        user_id: UserId,
        user_name: Option<String>,
        response: oneshot::Sender<GameResult<JoinOutcome>>,
    },
    Leave {
        user_id: UserId,
        response: oneshot::Sender<GameResult<()>>,
    },
    Start {
        user_id: UserId,
        response: oneshot::Sender<GameResult<()>>,
    },
    CallNumber {
        user_id: UserId,
        number: u8,
        response: oneshot::Sender<GameResult<()>>,
    },
    MarkNumber {
        user_id: UserId,
        player_id: super::entities::PlayerId,
        number: u8,
        response: oneshot::Sender<GameResult<()>>,
    },
    ClaimWin {
        user_id: UserId,
        category: Category,
        response: oneshot::Sender<GameResult<()>>,
    },
    Cancel {
        user_id: UserId,
        response: oneshot::Sender<GameResult<()>>,
    },
    GetStateSync {
        user_id: UserId,
        response: oneshot::Sender<GameResult<StateSync>>,
    },
}

/// Outbound wire events, matching the protocol in the design doc verbatim.
/// `event` carries the socket.io-style event name; payloads are tagged so
/// the ingress layer can serialize them without a second translation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum OutboundEvent {
    #[serde(rename = "game:joined")]
    Joined {
        #[serde(rename = "gameId")]
        game_id: GameId,
        #[serde(rename = "playerId")]
        player_id: Option<super::entities::PlayerId>,
        ticket: Option<super::entities::Ticket>,
    },
    #[serde(rename = "game:stateSync")]
    StateSync(StateSync),
    #[serde(rename = "game:playerJoined")]
    PlayerJoined {
        #[serde(rename = "playerId")]
        player_id: super::entities::PlayerId,
        #[serde(rename = "userName")]
        user_name: String,
    },
    #[serde(rename = "game:started")]
    Started {
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
    #[serde(rename = "game:numberCalled")]
    NumberCalled { number: u8 },
    /// Point-to-point ack for `game:callNumber`, delivered only to the
    /// caller's own socket via [`crate::broadcast::Broadcaster::emit_to`].
    #[serde(rename = "game:callNumberAck")]
    CallNumberAck { success: bool, error: Option<String> },
    #[serde(rename = "game:winClaimed")]
    WinClaimed {
        category: Category,
        success: bool,
        message: String,
    },
    #[serde(rename = "game:winner")]
    Winner {
        #[serde(rename = "playerId")]
        player_id: super::entities::PlayerId,
        #[serde(rename = "userName")]
        user_name: String,
        category: Category,
    },
    #[serde(rename = "game:completed")]
    Completed {
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
    #[serde(rename = "game:cancelled")]
    Cancelled {
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
    #[serde(rename = "error")]
    Error { code: &'static str, message: String },
}
