use crate::errors::Error;
use crate::types::CompanyId;
use rust_decimal::Decimal;
use std::fmt::{self, Display};
use thiserror::Error;

/// Why the access gate refused a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenReason {
    NoCompanyContext,
    PermissionDenied {
        permission: String,
        company_name: String,
    },
}

impl Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCompanyContext => write!(f, "Company context not found."),
            Self::PermissionDenied {
                permission,
                company_name,
            } => write!(
                f,
                "Feature '{permission}' is not available for {company_name}."
            ),
        }
    }
}

/// Failures surfaced by the entitlement engine
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Permission '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid price {0}: must be between 0 and 999999999.99")]
    InvalidPrice(Decimal),

    #[error("Invalid permission name: {0}")]
    InvalidName(String),

    #[error("Permission '{current}' cannot be renamed to '{requested}'")]
    ImmutableName { current: String, requested: String },

    #[error("Permission not found: {0}")]
    NotFound(String),

    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(CompanyId),

    #[error("Provisioning failed for company '{company}': {reason}")]
    ProvisioningFailed { company: String, reason: String },

    #[error("{0}")]
    Forbidden(ForbiddenReason),

    #[error(transparent)]
    Storage(Error),
}

impl From<Error> for AccessError {
    fn from(err: Error) -> Self {
        match err {
            Error::CompanyNotFound(id) => Self::CompanyNotFound(id),
            Error::PermissionNotFound(name) => Self::NotFound(name),
            other => Self::Storage(other),
        }
    }
}

impl AccessError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

pub type AccessResult<T> = std::result::Result<T, AccessError>;
