//! Library half of the Tambola server binary, split out so integration
//! tests can build a real [`api::AppState`] and router without going
//! through the CLI entry point.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
