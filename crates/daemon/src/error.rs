use permit_core::access::AccessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] permit_core::Error),

    #[error("Seeding failed: {0}")]
    Seed(#[from] AccessError),

    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon operations
pub type Result<T> = std::result::Result<T, DaemonError>;
