//! Error taxonomy for game engine operations.

use thiserror::Error;

use crate::db::DbError;
use crate::hotstate::HotStateError;
use crate::prize_queue::PrizeQueueError;

/// Failures a [`crate::game::actor::GameActor`] operation can return.
///
/// Each variant maps onto exactly one wire error code via [`GameError::code`]
/// so the ingress layer never has to pattern-match strings.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game not found")]
    GameNotFound,
    #[error("game already started")]
    GameAlreadyStarted,
    #[error("caller is not the game's creator")]
    Forbidden,
    #[error("game is not in the required status")]
    InvalidStatus,
    #[error("game is not active")]
    GameNotActive,
    #[error("cannot start a game with no players")]
    NoPlayers,
    #[error("number {0} is outside 1..=90")]
    OutOfRange(u8),
    #[error("number {0} was already called")]
    NumberAlreadyCalled(u8),
    #[error("number {0} has not been called yet")]
    NumberNotCalled(u8),
    #[error("player does not belong to the calling user in this game")]
    InvalidPlayer,
    #[error("player not found")]
    PlayerNotFound,
    #[error("category {0} has already been won")]
    CategoryAlreadyWon(&'static str),
    #[error("category {0} is being claimed by another player")]
    CategoryAlreadyClaimed(&'static str),
    #[error("ticket does not satisfy the claimed category")]
    InvalidClaim,
    #[error("all 90 numbers have been called without a full house")]
    GameExhausted,
    #[error("hot state error: {0}")]
    HotState(#[from] HotStateError),
    #[error("durable store error: {0}")]
    Db(#[from] DbError),
    #[error("prize queue error: {0}")]
    PrizeQueue(#[from] PrizeQueueError),
}

impl GameError {
    /// The wire protocol error code sent to clients in an `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::GameNotFound => "GAME_NOT_FOUND",
            GameError::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            GameError::Forbidden => "FORBIDDEN",
            GameError::InvalidStatus => "INVALID_STATUS",
            GameError::GameNotActive => "GAME_NOT_ACTIVE",
            GameError::NoPlayers => "NO_PLAYERS",
            GameError::OutOfRange(_) => "OUT_OF_RANGE",
            GameError::NumberAlreadyCalled(_) => "NUMBER_ALREADY_CALLED",
            GameError::NumberNotCalled(_) => "NUMBER_NOT_CALLED",
            GameError::InvalidPlayer => "INVALID_PLAYER",
            GameError::PlayerNotFound => "PLAYER_NOT_FOUND",
            GameError::CategoryAlreadyWon(_) => "CATEGORY_ALREADY_WON",
            GameError::CategoryAlreadyClaimed(_) => "CATEGORY_ALREADY_CLAIMED",
            GameError::InvalidClaim => "INVALID_CLAIM",
            GameError::GameExhausted => "GAME_EXHAUSTED",
            GameError::HotState(_) | GameError::Db(_) | GameError::PrizeQueue(_) => {
                "HANDLER_ERROR"
            }
        }
    }

    /// Whether this failure originates from infrastructure rather than the
    /// caller's request, per the transient-infrastructure error class.
    pub fn is_transient_infrastructure(&self) -> bool {
        matches!(
            self,
            GameError::HotState(_) | GameError::Db(_) | GameError::PrizeQueue(_)
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;
