//! Permit daemon: configuration, startup seeding and the HTTP server

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Settings;
pub use error::{DaemonError, Result};
pub use server::ServerBuilder;
pub use state::ServerState;
