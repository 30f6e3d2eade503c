//! Bounded-retry prize payout queue.
//!
//! Mirrors the idempotent-transfer discipline the wallet ledger uses for
//! external money movement: every attempt carries a stable idempotency key,
//! and a row only ever moves forward through its state machine.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::errors::{PrizeQueueError, PrizeQueueResult};
use super::models::{PrizeQueueItem, PrizeQueueItemId, PrizeStatus};
use super::payout_client::PayoutClient;
use crate::constants::{MAX_PRIZE_ATTEMPTS, PRIZE_PROCESSING_LEASE_SECS};
use crate::db::DurableStore;
use crate::game::entities::{Category, GameId, UserId};

pub struct PrizeQueueManager {
    store: Arc<dyn DurableStore>,
    client: Arc<dyn PayoutClient>,
}

impl PrizeQueueManager {
    pub fn new(store: Arc<dyn DurableStore>, client: Arc<dyn PayoutClient>) -> Self {
        Self { store, client }
    }

    /// Enqueue a prize payout for a just-recorded win. A uniqueness
    /// collision on `(gameId, category)` is treated as idempotent success:
    /// the row already exists from an earlier attempt at recording this
    /// same win, so there is nothing new to do.
    ///
    /// This only inserts the row; it never calls out to the payout client
    /// itself, so the game actor's single-writer loop never blocks on an
    /// external HTTP round trip. [`Self::run_retry_loop`]'s sweep picks up
    /// every `PENDING` row within one tick.
    pub async fn enqueue(
        &self,
        user_id: UserId,
        game_id: GameId,
        category: Category,
        prize_value: i64,
    ) -> PrizeQueueResult<PrizeQueueItem> {
        let idempotency_key = format!("prize:{game_id}:{}", category.as_str());
        let item = PrizeQueueItem {
            id: Uuid::new_v4(),
            user_id,
            game_id,
            category,
            prize_value,
            status: PrizeStatus::Pending,
            attempts: 0,
            last_attempt: None,
            error: None,
            idempotency_key,
            created_at: chrono::Utc::now(),
        };
        Ok(self.store.try_enqueue_prize(&item).await?)
    }

    /// Drive a single pending or retry-eligible item through one attempt at
    /// the payout call. Safe to call concurrently for different items; a
    /// CAS on `status` keeps two workers from double-processing the same
    /// one.
    pub async fn process(&self, id: PrizeQueueItemId) -> PrizeQueueResult<()> {
        let item = self
            .store
            .get_prize_item(id)
            .await?
            .ok_or(PrizeQueueError::NotFound(id))?;

        if !matches!(item.status, PrizeStatus::Pending | PrizeStatus::Failed) {
            return Ok(());
        }

        let claimed = self
            .store
            .cas_prize_status(id, item.status, PrizeStatus::Processing)
            .await?;
        if !claimed {
            return Ok(());
        }

        let attempts = item.attempts + 1;
        let outcome = self
            .client
            .pay(&item.idempotency_key, item.user_id, item.game_id, item.category, item.prize_value)
            .await;

        match outcome {
            Ok(()) => {
                self.store
                    .record_prize_attempt(id, attempts, PrizeStatus::Completed, None)
                    .await?;
                if let Some(winner) = self.store.get_winner(item.game_id, item.category).await? {
                    self.store.mark_prize_claimed(winner.id, item.prize_value).await?;
                }
                log::info!("prize {id} paid out to {} after {attempts} attempt(s)", item.user_id);
                Ok(())
            }
            Err(e) => {
                let next_status = if attempts >= MAX_PRIZE_ATTEMPTS {
                    PrizeStatus::DeadLetter
                } else {
                    PrizeStatus::Failed
                };
                self.store
                    .record_prize_attempt(id, attempts, next_status, Some(e.to_string()))
                    .await?;
                if next_status == PrizeStatus::DeadLetter {
                    log::error!("prize {id} dead-lettered after {attempts} attempts: {e}");
                } else {
                    log::warn!("prize {id} attempt {attempts} failed, will retry: {e}");
                }
                Ok(())
            }
        }
    }

    /// Background loop: sweep for retry-eligible and stuck items on a fixed
    /// cadence. Exits when the channel it reads from (none here — this is a
    /// free-running ticker) is cancelled by dropping the returned task.
    pub async fn run_retry_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                log::warn!("prize queue sweep failed: {e}");
            }
        }
    }

    async fn sweep_once(&self) -> PrizeQueueResult<()> {
        let stale = self.store.reap_stale_processing(PRIZE_PROCESSING_LEASE_SECS).await?;
        for id in stale {
            log::warn!("reaping stale processing lease on prize {id}");
            self.process(id).await?;
        }

        // Every freshly-enqueued PENDING item gets its first attempt here,
        // plus every FAILED item whose backoff window has now elapsed.
        for id in self.store.list_pending().await? {
            self.process(id).await?;
        }
        for id in self.store.list_retry_ready(chrono::Utc::now()).await? {
            self.process(id).await?;
        }
        Ok(())
    }

    /// Operator-triggered retry of a dead-lettered item.
    pub async fn manual_retry(&self, id: PrizeQueueItemId) -> PrizeQueueResult<()> {
        self.store.reset_for_manual_retry(id).await?;
        self.process(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDurableStore;
    use crate::prize_queue::payout_client::ScriptedPayoutClient;

    fn sample_game_id() -> GameId {
        GameId::new_v4()
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_per_category() {
        let store = Arc::new(InMemoryDurableStore::new());
        let client = Arc::new(ScriptedPayoutClient::new(vec![]));
        let manager = PrizeQueueManager::new(store, client);
        let game_id = sample_game_id();
        let user_id = UserId::new_v4();

        let first = manager.enqueue(user_id, game_id, Category::FullHouse, 500).await.unwrap();
        let second = manager.enqueue(user_id, game_id, Category::FullHouse, 500).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn process_marks_completed_on_success() {
        let store = Arc::new(InMemoryDurableStore::new());
        let client = Arc::new(ScriptedPayoutClient::new(vec![Ok(())]));
        let manager = PrizeQueueManager::new(store.clone(), client);
        let game_id = sample_game_id();
        let user_id = UserId::new_v4();

        let item = manager.enqueue(user_id, game_id, Category::Early5, 100).await.unwrap();
        manager.process(item.id).await.unwrap();

        let refreshed = store.get_prize_item(item.id).await.unwrap().unwrap();
        assert_eq!(refreshed.status, PrizeStatus::Completed);
    }

    #[tokio::test]
    async fn process_dead_letters_after_max_attempts() {
        let store = Arc::new(InMemoryDurableStore::new());
        let client = Arc::new(ScriptedPayoutClient::new(vec![
            Err(PrizeQueueError::PayoutFailed("1".into())),
            Err(PrizeQueueError::PayoutFailed("2".into())),
            Err(PrizeQueueError::PayoutFailed("3".into())),
        ]));
        let manager = PrizeQueueManager::new(store.clone(), client);
        let game_id = sample_game_id();
        let user_id = UserId::new_v4();

        let item = manager.enqueue(user_id, game_id, Category::TopLine, 50).await.unwrap();
        for _ in 0..3 {
            manager.process(item.id).await.unwrap();
        }

        let refreshed = store.get_prize_item(item.id).await.unwrap().unwrap();
        assert_eq!(refreshed.status, PrizeStatus::DeadLetter);
        assert_eq!(refreshed.attempts, 3);
    }
}
