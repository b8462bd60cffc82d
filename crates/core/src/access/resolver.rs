use super::cache::{EntitlementCache, EntitlementKey};
use super::error::AccessResult;
use super::grants::GrantStore;
use crate::CompanyId;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Answers whether a company may use a feature
pub struct EntitlementResolver {
    grants: Arc<GrantStore>,
    cache: Arc<EntitlementCache>,
}

impl EntitlementResolver {
    pub fn new(grants: Arc<GrantStore>, cache: Arc<EntitlementCache>) -> Self {
        Self { grants, cache }
    }

    /// `true` when `company_id` currently holds `permission`.
    ///
    /// Unregistered permissions fail with `UnknownPermission` and are never cached.
    #[instrument(name = "entitlements.can_use", skip(self))]
    pub async fn can_use(&self, company_id: CompanyId, permission: &str) -> AccessResult<bool> {
        let key = EntitlementKey::new(company_id, permission);

        if let Some(allowed) = self.cache.lookup(&key) {
            debug!(allowed, "Entitlement cache hit");
            return Ok(allowed);
        }

        let generation = self.cache.generation();
        let allowed = self.grants.has_grant(company_id, permission).await?;
        let cached = self.cache.remember(key, allowed, generation);
        debug!(allowed, cached, "Entitlement resolved from store");

        Ok(allowed)
    }

    pub fn cache(&self) -> &EntitlementCache {
        &self.cache
    }
}
