//! Permit HTTP layer: routes, middleware and JWT identity
//!
//! Routers are built with `utoipa-axum` so every documented handler ends up in
//! the OpenAPI document served by the daemon.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{HttpError, Result};
pub use state::AppState;

// Re-export commonly used types
pub use axum::{Json, extract, response};
pub use utoipa::OpenApi;
