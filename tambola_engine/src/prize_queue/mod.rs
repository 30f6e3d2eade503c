//! Bounded-retry dead-letter prize payout pipeline.

pub mod errors;
pub mod manager;
pub mod models;
pub mod payout_client;

pub use errors::{PrizeQueueError, PrizeQueueResult};
pub use manager::PrizeQueueManager;
pub use models::{PrizeQueueItem, PrizeQueueItemId, PrizeStatus};
pub use payout_client::{HttpPayoutClient, PayoutClient};
