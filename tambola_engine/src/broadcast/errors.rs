//! Broadcast subsystem error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("pub/sub connection error: {0}")]
    Connection(String),

    #[error("failed to encode outbound event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<redis::RedisError> for BroadcastError {
    fn from(err: redis::RedisError) -> Self {
        BroadcastError::Connection(err.to_string())
    }
}

pub type BroadcastResult<T> = Result<T, BroadcastError>;
