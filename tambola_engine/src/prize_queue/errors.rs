//! Prize queue error types.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum PrizeQueueError {
    #[error("durable store error: {0}")]
    Db(#[from] DbError),

    #[error("prize queue item {0} not found")]
    NotFound(crate::prize_queue::models::PrizeQueueItemId),

    #[error("payout call failed: {0}")]
    PayoutFailed(String),

    #[error("payout call timed out")]
    PayoutTimeout,
}

pub type PrizeQueueResult<T> = Result<T, PrizeQueueError>;
