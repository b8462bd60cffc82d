//! SQLx-based StateBackend implementation for SQLite

mod common;
mod sqlite;

pub use sqlite::SqliteStateBackend;
