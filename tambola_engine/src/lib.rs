//! # Tambola Engine
//!
//! A realtime 90-ball Tambola (housie/bingo) game engine built around a
//! per-game actor: one asynchronous task owns a game's mutable state for
//! its entire lifetime, serializing every join, number call, ticket mark
//! and win claim against it so the rest of the system never has to reason
//! about interleaved mutation.
//!
//! ## Core modules
//!
//! - [`game`]: entities, the per-game actor/handle pair, and the registry
//!   that spawns and reaps them on demand.
//! - [`ticket`] / [`win_validator`]: pure ticket generation and win-condition
//!   evaluation, with no I/O or shared state.
//! - [`hotstate`]: ephemeral, TTL'd KV-backed game state (Redis in
//!   production) consulted before falling back to the durable store.
//! - [`db`]: the relational durable store for games, players, winners and
//!   prize queue rows.
//! - [`prize_queue`]: bounded-retry, dead-letter prize payout pipeline.
//! - [`broadcast`]: cross-instance room fan-out over pub/sub.

pub mod broadcast;
pub mod constants;
pub mod db;
pub mod game;
pub mod hotstate;
pub mod prize_queue;
pub mod ticket;
pub mod win_validator;

pub use game::entities::{Category, Game, GameId, Player, PlayerId, Ticket, UserId};
pub use game::{GameError, GameHandle, GameRegistry, GameResult};
