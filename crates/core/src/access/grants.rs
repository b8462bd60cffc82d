use super::cache::{EntitlementCache, EntitlementKey};
use super::error::{AccessError, AccessResult};
use crate::{CompanyId, Permission, StateBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// One company that could not be granted during a bulk grant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkGrantFailure {
    pub company_id: CompanyId,
    pub reason: String,
}

/// Outcome of granting one permission to many companies
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkGrantReport {
    pub permission: String,
    pub granted: Vec<CompanyId>,
    pub failed: Vec<BulkGrantFailure>,
}

impl BulkGrantReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Company to permission associations.
///
/// Every mutation invalidates the matching cache entry before it returns.
pub struct GrantStore {
    backend: Arc<dyn StateBackend>,
    cache: Arc<EntitlementCache>,
}

impl GrantStore {
    pub fn new(backend: Arc<dyn StateBackend>, cache: Arc<EntitlementCache>) -> Self {
        Self { backend, cache }
    }

    async fn registered(&self, permission: &str) -> AccessResult<Permission> {
        self.backend
            .get_permission(permission)
            .await?
            .ok_or_else(|| AccessError::UnknownPermission(permission.to_string()))
    }

    async fn store_grant(&self, company_id: CompanyId, permission: &str) -> AccessResult<bool> {
        let inserted = self.backend.insert_grant(company_id, permission).await?;
        self.cache
            .invalidate(&EntitlementKey::new(company_id, permission));
        Ok(inserted)
    }

    /// Grant `permission` to a company. Granting twice is a no-op.
    #[instrument(name = "grants.grant", skip(self))]
    pub async fn grant(&self, company_id: CompanyId, permission: &str) -> AccessResult<()> {
        self.registered(permission).await?;

        if self.store_grant(company_id, permission).await? {
            info!(company_id, permission, "Permission granted");
        }
        Ok(())
    }

    /// Revoke `permission` from a company. Revoking an absent grant is a no-op.
    #[instrument(name = "grants.revoke", skip(self))]
    pub async fn revoke(&self, company_id: CompanyId, permission: &str) -> AccessResult<()> {
        self.registered(permission).await?;

        let removed = self.backend.delete_grant(company_id, permission).await?;
        self.cache
            .invalidate(&EntitlementKey::new(company_id, permission));

        if removed {
            info!(company_id, permission, "Permission revoked");
        }
        Ok(())
    }

    /// Full permission records held by a company
    #[instrument(name = "grants.list", skip(self))]
    pub async fn list_grants(&self, company_id: CompanyId) -> AccessResult<Vec<Permission>> {
        if self.backend.get_company(company_id).await?.is_none() {
            return Err(AccessError::CompanyNotFound(company_id));
        }

        Ok(self.backend.list_company_permissions(company_id).await?)
    }

    #[instrument(name = "grants.has_grant", skip(self))]
    pub async fn has_grant(&self, company_id: CompanyId, permission: &str) -> AccessResult<bool> {
        self.registered(permission).await?;
        Ok(self.backend.grant_exists(company_id, permission).await?)
    }

    /// Grant one permission to many companies.
    ///
    /// Each company is handled on its own: a failure is recorded in the report
    /// and the remaining companies are still granted. Only an unregistered
    /// permission fails the whole call.
    #[instrument(name = "grants.bulk_grant", skip(self, company_ids), fields(companies = company_ids.len()))]
    pub async fn bulk_grant(
        &self,
        permission: &str,
        company_ids: &[CompanyId],
    ) -> AccessResult<BulkGrantReport> {
        self.registered(permission).await?;

        let mut report = BulkGrantReport {
            permission: permission.to_string(),
            ..Default::default()
        };

        for &company_id in company_ids {
            match self.store_grant(company_id, permission).await {
                Ok(_) => report.granted.push(company_id),
                Err(e) => {
                    warn!(company_id, permission, error = %e, "Bulk grant failed for company");
                    report.failed.push(BulkGrantFailure {
                        company_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            permission,
            granted = report.granted.len(),
            failed = report.failed.len(),
            "Bulk grant finished"
        );

        Ok(report)
    }
}
