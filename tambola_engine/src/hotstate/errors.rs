//! Hot state error types.

use thiserror::Error;

/// Errors surfaced by the KV-backed hot state layer.
#[derive(Debug, Error)]
pub enum HotStateError {
    /// The underlying KV connection failed or timed out.
    #[error("hot state connection error: {0}")]
    Connection(String),

    /// A value stored under a key could not be decoded into the expected shape.
    #[error("corrupt hot state value at key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<redis::RedisError> for HotStateError {
    fn from(err: redis::RedisError) -> Self {
        HotStateError::Connection(err.to_string())
    }
}

pub type HotStateResult<T> = Result<T, HotStateError>;
