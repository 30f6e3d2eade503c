//! Timeout wrappers for durable store calls, so a stalled pool cannot wedge
//! a game actor indefinitely.

use std::time::Duration;
use tokio::time::timeout;

use super::errors::{DbError, DbResult};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn with_timeout<F, T>(duration: Duration, future: F) -> DbResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DbError::Query(e)),
        Err(_) => Err(DbError::Timeout(duration)),
    }
}

pub async fn with_default_timeout<F, T>(future: F) -> DbResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_error_mentions_duration() {
        let err = DbError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }
}
