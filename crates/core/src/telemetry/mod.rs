//! Logging setup shared by the binaries.
//!
//! `config` is always available so settings files can carry it; installing a
//! subscriber needs the `subscriber` feature.

pub mod config;
#[cfg(feature = "subscriber")]
pub mod init;

pub use config::InstrumentationConfig;
#[cfg(feature = "subscriber")]
pub use init::init_tracing;
