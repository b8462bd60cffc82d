use crate::types::CompanyId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(CompanyId),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("State backend error: {0}")]
    StateError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
