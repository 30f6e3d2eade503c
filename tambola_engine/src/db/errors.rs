//! Durable store error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the relational durable store. Kept infrastructure-only
/// on purpose: "row isn't there" is expressed as `Ok(None)` by the store
/// trait, not as a variant here, so [`crate::game::errors::GameError`] can
/// treat every `DbError` as transient infrastructure.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type DbResult<T> = Result<T, DbError>;
