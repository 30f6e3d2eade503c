//! Domain-wide constants for the tambola engine.

/// Tambola tickets are drawn from a pool of numbers 1 through 90 inclusive.
pub const MIN_NUMBER: u8 = 1;

/// See [`MIN_NUMBER`].
pub const MAX_NUMBER: u8 = 90;

/// Every ticket has exactly three rows.
pub const TICKET_ROWS: usize = 3;

/// Every ticket has exactly nine columns, one per decade of numbers.
pub const TICKET_COLS: usize = 9;

/// Every row carries exactly five non-blank numbers.
pub const NUMBERS_PER_ROW: usize = 5;

/// A full ticket carries exactly fifteen non-blank numbers.
pub const NUMBERS_PER_TICKET: usize = TICKET_ROWS * NUMBERS_PER_ROW;

/// `EARLY_5` is won by daubing this many numbers, regardless of position.
pub const EARLY_FIVE_COUNT: usize = 5;

/// Maximum bounded retry attempts before a prize queue item is dead-lettered.
pub const MAX_PRIZE_ATTEMPTS: u32 = 3;

/// Retry backoff schedule indexed by `attempts - 1`.
pub const PRIZE_RETRY_DELAYS_SECS: [u64; 3] = [1, 5, 30];

/// TTL refreshed on every write to `game:{id}:state`.
pub const HOT_STATE_TTL_SECS: u64 = 2 * 60 * 60;

/// TTL for the single-holder winner-category lock.
pub const WINNER_LOCK_TTL_SECS: u64 = 5;

/// Lease duration after which a `PROCESSING` prize queue row is reclaimable.
pub const PRIZE_PROCESSING_LEASE_SECS: i64 = 60;
