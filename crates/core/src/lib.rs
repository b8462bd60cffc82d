//! Permit core types, storage contract and the entitlement engine

pub mod access;
pub mod errors;
pub mod state;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "tests"))]
pub mod tests;

pub use errors::{Error, Result};
pub use state::StateBackend;
pub use types::{
    Company, CompanyCategory, CompanyFilter, CompanyId, CompanyUpdate, NewCompany,
    NewPermission, Permission, PermissionChanges, PermissionFilter, PermissionSort,
    PermissionType, slugify,
};
