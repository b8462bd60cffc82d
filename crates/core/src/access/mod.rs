//! Entitlement engine: which company may use which feature.
//!
//! The pieces are wired once per process through [`Entitlements`]:
//!
//! - [`PermissionRegistry`] owns the catalog of permission definitions
//! - [`GrantStore`] records which company holds which permission
//! - [`EntitlementResolver`] answers `can_use` through a short-lived cache
//! - [`ProvisioningPolicy`] hands General permissions to companies
//! - [`AccessGate`] is the fail-closed per-request check

pub mod cache;
pub mod error;
pub mod gate;
pub mod grants;
pub mod identity;
pub mod provisioning;
pub mod registry;
pub mod resolver;

pub use cache::{EntitlementCache, EntitlementKey};
pub use error::{AccessError, AccessResult, ForbiddenReason};
pub use gate::AccessGate;
pub use grants::{BulkGrantFailure, BulkGrantReport, GrantStore};
pub use identity::{COMPANY_ID_ATTRIBUTE, IdentityContext, SubjectIdentity};
pub use provisioning::ProvisioningPolicy;
pub use registry::PermissionRegistry;
pub use resolver::EntitlementResolver;

use crate::StateBackend;
use std::sync::Arc;
use std::time::Duration;

/// The assembled engine, shared behind an `Arc` by every request handler
#[derive(Clone)]
pub struct Entitlements {
    registry: Arc<PermissionRegistry>,
    grants: Arc<GrantStore>,
    resolver: Arc<EntitlementResolver>,
    provisioning: Arc<ProvisioningPolicy>,
    gate: Arc<AccessGate>,
}

impl Entitlements {
    /// Build every component over `backend` with one shared cache
    pub fn new(backend: Arc<dyn StateBackend>, cache_ttl: Duration) -> Self {
        let cache = Arc::new(EntitlementCache::new(cache_ttl));
        let grants = Arc::new(GrantStore::new(backend.clone(), cache.clone()));
        let provisioning = Arc::new(ProvisioningPolicy::new(
            backend.clone(),
            grants.clone(),
            cache.clone(),
        ));
        let registry = Arc::new(PermissionRegistry::new(
            backend.clone(),
            provisioning.clone(),
            cache.clone(),
        ));
        let resolver = Arc::new(EntitlementResolver::new(grants.clone(), cache));
        let gate = Arc::new(AccessGate::new(backend, resolver.clone()));

        Self {
            registry,
            grants,
            resolver,
            provisioning,
            gate,
        }
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    pub fn grants(&self) -> &GrantStore {
        &self.grants
    }

    pub fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    pub fn provisioning(&self) -> &ProvisioningPolicy {
        &self.provisioning
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }
}
