//! Per-game ephemeral state backed by a shared KV store (Redis in
//! production), with the keyspace and TTL discipline from the design doc:
//!
//! - `game:{id}:state` — hash, TTL refreshed on every write.
//! - `game:{id}:player:{id}:ticket` — hash, marked-numbers cache.
//! - `lock:winner:{id}:{category}` — short-TTL single-holder lock.

pub mod errors;
pub mod memory;
pub mod redis_store;

pub use errors::{HotStateError, HotStateResult};
pub use memory::InMemoryHotState;
pub use redis_store::RedisHotState;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::game::entities::{Category, GameId, GameStatus, PlayerId, TicketState};

/// The authoritative-while-active snapshot of a game, as stored under
/// `game:{id}:state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameHotRow {
    pub status: GameStatus,
    pub called_numbers: Vec<u8>,
    pub current_number: Option<u8>,
    pub won_categories: BTreeSet<Category>,
    pub player_count: u32,
}

impl GameHotRow {
    pub fn new(status: GameStatus) -> Self {
        Self {
            status,
            called_numbers: Vec::new(),
            current_number: None,
            won_categories: BTreeSet::new(),
            player_count: 0,
        }
    }
}

/// KV-backed hot state operations used by the game engine. Implemented by
/// [`RedisHotState`] in production and [`InMemoryHotState`] in tests.
#[async_trait]
pub trait HotState: Send + Sync {
    /// Overwrite the full game row and refresh its TTL.
    async fn write_state(&self, game_id: GameId, row: &GameHotRow) -> HotStateResult<()>;

    /// Read the game row, if present (a miss means the caller should
    /// rehydrate from the durable store).
    async fn read_state(&self, game_id: GameId) -> HotStateResult<Option<GameHotRow>>;

    /// Read-modify-write helpers kept atomic at the call site by the game
    /// actor's single-writer-per-game discipline, not by the store itself.
    async fn set_player_count(&self, game_id: GameId, count: u32) -> HotStateResult<()>;

    async fn write_ticket_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        state: &TicketState,
    ) -> HotStateResult<()>;

    async fn read_ticket_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> HotStateResult<Option<TicketState>>;

    /// Attempt to acquire the single-holder winner-category lock via an
    /// atomic set-if-absent. Returns `true` if this caller now holds it.
    async fn try_acquire_winner_lock(
        &self,
        game_id: GameId,
        category: Category,
    ) -> HotStateResult<bool>;

    async fn release_winner_lock(&self, game_id: GameId, category: Category) -> HotStateResult<()>;

    /// Scan-and-delete sweep of every `game:{id}:*` key, called once a game
    /// reaches `COMPLETED`/`CANCELLED`.
    async fn delete_game_keys(&self, game_id: GameId) -> HotStateResult<()>;
}

/// Key-builders, split out so the Redis and in-memory backends (and tests
/// asserting on key shape) agree on the exact keyspace from the design doc.
pub mod keys {
    use crate::game::entities::{Category, GameId, PlayerId};

    pub fn state(game_id: GameId) -> String {
        format!("game:{game_id}:state")
    }

    pub fn ticket(game_id: GameId, player_id: PlayerId) -> String {
        format!("game:{game_id}:player:{player_id}:ticket")
    }

    pub fn winner_lock(game_id: GameId, category: Category) -> String {
        format!("lock:winner:{game_id}:{}", category.as_str())
    }

    pub fn game_prefix(game_id: GameId) -> String {
        format!("game:{game_id}:*")
    }
}
