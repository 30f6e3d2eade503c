//! Prize queue data model.

use chrono::{DateTime, Utc};

use crate::game::entities::{Category, GameId, UserId};

pub type PrizeQueueItemId = uuid::Uuid;

/// Lifecycle of a single prize payout attempt pipeline.
///
/// `Completed` is a dead end: the queue never transitions it back to
/// anything else, matching the at-most-once-success guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrizeStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    DeadLetter,
}

impl PrizeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrizeStatus::Pending => "PENDING",
            PrizeStatus::Processing => "PROCESSING",
            PrizeStatus::Completed => "COMPLETED",
            PrizeStatus::Failed => "FAILED",
            PrizeStatus::DeadLetter => "DEAD_LETTER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "PENDING" => PrizeStatus::Pending,
            "PROCESSING" => PrizeStatus::Processing,
            "COMPLETED" => PrizeStatus::Completed,
            "FAILED" => PrizeStatus::Failed,
            "DEAD_LETTER" => PrizeStatus::DeadLetter,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PrizeQueueItem {
    pub id: PrizeQueueItemId,
    pub user_id: UserId,
    pub game_id: GameId,
    pub category: Category,
    pub prize_value: i64,
    pub status: PrizeStatus,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl PrizeQueueItem {
    /// Delay before the next retry, indexed by the attempt number that just
    /// failed (1-based). `None` once the bound is exhausted.
    pub fn retry_delay_secs(attempts: u32) -> Option<u64> {
        crate::constants::PRIZE_RETRY_DELAYS_SECS
            .get(attempts.saturating_sub(1) as usize)
            .copied()
    }
}
