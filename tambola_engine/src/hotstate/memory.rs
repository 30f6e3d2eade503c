//! In-process `HotState` implementation used by unit/integration tests and
//! by single-instance deployments that don't need cross-instance sharing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{GameHotRow, HotState, HotStateResult};
use crate::game::entities::{Category, GameId, PlayerId, TicketState};

#[derive(Debug, Default)]
pub struct InMemoryHotState {
    states: Mutex<HashMap<GameId, GameHotRow>>,
    tickets: Mutex<HashMap<(GameId, PlayerId), TicketState>>,
    locks: Mutex<HashMap<(GameId, Category), ()>>,
}

impl InMemoryHotState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HotState for InMemoryHotState {
    async fn write_state(&self, game_id: GameId, row: &GameHotRow) -> HotStateResult<()> {
        self.states.lock().unwrap().insert(game_id, row.clone());
        Ok(())
    }

    async fn read_state(&self, game_id: GameId) -> HotStateResult<Option<GameHotRow>> {
        Ok(self.states.lock().unwrap().get(&game_id).cloned())
    }

    async fn set_player_count(&self, game_id: GameId, count: u32) -> HotStateResult<()> {
        if let Some(row) = self.states.lock().unwrap().get_mut(&game_id) {
            row.player_count = count;
        }
        Ok(())
    }

    async fn write_ticket_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        state: &TicketState,
    ) -> HotStateResult<()> {
        self.tickets
            .lock()
            .unwrap()
            .insert((game_id, player_id), state.clone());
        Ok(())
    }

    async fn read_ticket_state(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> HotStateResult<Option<TicketState>> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .get(&(game_id, player_id))
            .cloned())
    }

    async fn try_acquire_winner_lock(
        &self,
        game_id: GameId,
        category: Category,
    ) -> HotStateResult<bool> {
        let mut locks = self.locks.lock().unwrap();
        let key = (game_id, category);
        if locks.contains_key(&key) {
            Ok(false)
        } else {
            locks.insert(key, ());
            Ok(true)
        }
    }

    async fn release_winner_lock(&self, game_id: GameId, category: Category) -> HotStateResult<()> {
        self.locks.lock().unwrap().remove(&(game_id, category));
        Ok(())
    }

    async fn delete_game_keys(&self, game_id: GameId) -> HotStateResult<()> {
        self.states.lock().unwrap().remove(&game_id);
        self.tickets.lock().unwrap().retain(|(g, _), _| *g != game_id);
        self.locks.lock().unwrap().retain(|(g, _), _| *g != game_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::GameStatus;

    #[tokio::test]
    async fn winner_lock_is_single_holder() {
        let store = InMemoryHotState::new();
        let game_id = GameId::new_v4();
        assert!(
            store
                .try_acquire_winner_lock(game_id, Category::FullHouse)
                .await
                .unwrap()
        );
        assert!(
            !store
                .try_acquire_winner_lock(game_id, Category::FullHouse)
                .await
                .unwrap()
        );
        store
            .release_winner_lock(game_id, Category::FullHouse)
            .await
            .unwrap();
        assert!(
            store
                .try_acquire_winner_lock(game_id, Category::FullHouse)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn delete_game_keys_clears_everything_for_that_game() {
        let store = InMemoryHotState::new();
        let game_id = GameId::new_v4();
        let player_id = PlayerId::new_v4();
        store
            .write_state(game_id, &GameHotRow::new(GameStatus::Active))
            .await
            .unwrap();
        store
            .write_ticket_state(game_id, player_id, &TicketState::default())
            .await
            .unwrap();

        store.delete_game_keys(game_id).await.unwrap();

        assert!(store.read_state(game_id).await.unwrap().is_none());
        assert!(
            store
                .read_ticket_state(game_id, player_id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
