//! External payout API client.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::errors::{PrizeQueueError, PrizeQueueResult};
use crate::game::entities::{Category, GameId, UserId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PayoutRequest {
    #[serde(rename = "userId")]
    user_id: UserId,
    #[serde(rename = "gameId")]
    game_id: GameId,
    category: Category,
    #[serde(rename = "prizeValue")]
    prize_value: i64,
}

/// Issues the external prize payout, carrying the idempotency key the
/// caller generated for this queue item. Implemented by [`HttpPayoutClient`]
/// in production and a scripted fake in tests.
#[async_trait]
pub trait PayoutClient: Send + Sync {
    async fn pay(
        &self,
        idempotency_key: &str,
        user_id: UserId,
        game_id: GameId,
        category: Category,
        prize_value: i64,
    ) -> PrizeQueueResult<()>;
}

pub struct HttpPayoutClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPayoutClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PayoutClient for HttpPayoutClient {
    async fn pay(
        &self,
        idempotency_key: &str,
        user_id: UserId,
        game_id: GameId,
        category: Category,
        prize_value: i64,
    ) -> PrizeQueueResult<()> {
        let body = PayoutRequest {
            user_id,
            game_id,
            category,
            prize_value,
        };

        let result = self
            .client
            .post(&self.endpoint)
            .header("Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(PrizeQueueError::PayoutTimeout),
            Err(e) => return Err(PrizeQueueError::PayoutFailed(e.to_string())),
        };

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(PrizeQueueError::PayoutFailed(format!("{status}: {text}")))
        }
    }
}

/// A scripted payout client for tests: queue up outcomes, one per call.
#[cfg(any(test, feature = "test-util"))]
pub struct ScriptedPayoutClient {
    outcomes: std::sync::Mutex<std::collections::VecDeque<PrizeQueueResult<()>>>,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedPayoutClient {
    pub fn new(outcomes: Vec<PrizeQueueResult<()>>) -> Self {
        Self {
            outcomes: std::sync::Mutex::new(outcomes.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl PayoutClient for ScriptedPayoutClient {
    async fn pay(
        &self,
        idempotency_key: &str,
        _user_id: UserId,
        _game_id: GameId,
        _category: Category,
        _prize_value: i64,
    ) -> PrizeQueueResult<()> {
        self.calls.lock().unwrap().push(idempotency_key.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(PrizeQueueError::PayoutFailed("no scripted outcome left".into())))
    }
}
