//! Game state machine: entities, validation-facing errors, the actor that
//! owns a single game's mutable state, and the registry that multiplexes
//! many of them.

pub mod actor;
pub mod config;
pub mod entities;
pub mod errors;
pub mod messages;
pub mod registry;

pub use actor::{GameActor, GameHandle};
pub use config::GameSettings;
pub use errors::{GameError, GameResult};
pub use messages::{GameMessage, OutboundEvent};
pub use registry::GameRegistry;
