//! Spawns and multiplexes per-game actors on demand, self-healing if a
//! handle in the map points at an actor that has already reaped itself.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::actor::{GameActor, GameHandle};
use super::entities::{Game, GameId};
use super::errors::{GameError, GameResult};
use crate::broadcast::Broadcaster;
use crate::db::DurableStore;
use crate::hotstate::HotState;
use crate::prize_queue::PrizeQueueManager;

/// Registry of live [`GameHandle`]s, keyed by game id. Spawns an actor the
/// first time a game is addressed and transparently respawns it if the
/// previous actor reaped itself while idle.
pub struct GameRegistry {
    hot: Arc<dyn HotState>,
    db: Arc<dyn DurableStore>,
    prize_queue: Arc<PrizeQueueManager>,
    broadcaster: Arc<Broadcaster>,
    handles: RwLock<HashMap<GameId, GameHandle>>,
}

impl GameRegistry {
    pub fn new(
        hot: Arc<dyn HotState>,
        db: Arc<dyn DurableStore>,
        prize_queue: Arc<PrizeQueueManager>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            hot,
            db,
            prize_queue,
            broadcaster,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly-created game's actor before any client addresses
    /// it, so the creator's own `getStateSync` call never races the insert.
    pub async fn spawn_new(&self, game: Game) -> GameResult<GameHandle> {
        let game_id = game.id;
        self.db.insert_game(&game).await?;
        let handle = self.spawn(game).await?;
        self.handles.write().await.insert(game_id, handle.clone());
        Ok(handle)
    }

    /// Get the handle for `game_id`, spawning (or respawning) its actor on
    /// demand by loading the row from the durable store.
    pub async fn get_or_spawn(&self, game_id: GameId) -> GameResult<GameHandle> {
        if let Some(handle) = self.handles.read().await.get(&game_id).cloned() {
            return Ok(handle);
        }

        let game = self.db.get_game(game_id).await?.ok_or(GameError::GameNotFound)?;
        let handle = self.spawn(game).await?;
        self.handles.write().await.insert(game_id, handle.clone());
        Ok(handle)
    }

    /// Remove a handle whose actor has reaped itself, so the next
    /// `get_or_spawn` rehydrates a fresh one from the durable store.
    pub async fn evict(&self, game_id: GameId) {
        self.handles.write().await.remove(&game_id);
    }

    async fn spawn(&self, game: Game) -> GameResult<GameHandle> {
        GameActor::spawn(
            game,
            self.hot.clone(),
            self.db.clone(),
            self.prize_queue.clone(),
            self.broadcaster.clone(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::LoopbackPubSub;
    use crate::db::InMemoryDurableStore;
    use crate::game::entities::PrizeTable;
    use crate::hotstate::InMemoryHotState;
    use crate::prize_queue::payout_client::ScriptedPayoutClient;

    fn registry() -> GameRegistry {
        let hot: Arc<dyn HotState> = Arc::new(InMemoryHotState::new());
        let db: Arc<dyn DurableStore> = Arc::new(InMemoryDurableStore::new());
        let prize_queue = Arc::new(PrizeQueueManager::new(
            db.clone(),
            Arc::new(ScriptedPayoutClient::new(vec![])),
        ));
        let broadcaster = Arc::new(Broadcaster::new(Arc::new(LoopbackPubSub::new())));
        GameRegistry::new(hot, db, prize_queue, broadcaster)
    }

    #[tokio::test]
    async fn get_or_spawn_errors_for_unknown_game() {
        let registry = registry();
        let result = registry.get_or_spawn(GameId::new_v4()).await;
        assert!(matches!(result, Err(GameError::GameNotFound)));
    }

    #[tokio::test]
    async fn spawn_new_then_get_or_spawn_reuses_the_same_handle() {
        let registry = registry();
        let game = Game::new(GameId::new_v4(), uuid::Uuid::new_v4(), chrono::Utc::now(), PrizeTable {
            full_house: Some(100),
            ..Default::default()
        });
        let game_id = game.id;
        registry.spawn_new(game).await.unwrap();

        let handle = registry.get_or_spawn(game_id).await.unwrap();
        assert_eq!(handle.game_id, game_id);
    }
}
