use super::cache::EntitlementCache;
use super::error::{AccessError, AccessResult};
use super::grants::{BulkGrantReport, GrantStore};
use crate::{Company, CompanyId, NewCompany, PermissionFilter, PermissionType, StateBackend};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Hands General permissions to companies.
///
/// Runs at company registration and whenever a General permission appears.
pub struct ProvisioningPolicy {
    backend: Arc<dyn StateBackend>,
    grants: Arc<GrantStore>,
    cache: Arc<EntitlementCache>,
}

impl ProvisioningPolicy {
    pub fn new(
        backend: Arc<dyn StateBackend>,
        grants: Arc<GrantStore>,
        cache: Arc<EntitlementCache>,
    ) -> Self {
        Self {
            backend,
            grants,
            cache,
        }
    }

    async fn general_permission_names(&self) -> AccessResult<Vec<String>> {
        let permissions = self
            .backend
            .list_permissions(&PermissionFilter::of_type(PermissionType::General))
            .await?;
        Ok(permissions.into_iter().map(|p| p.name).collect())
    }

    /// Create a company and grant it every General permission.
    ///
    /// Either both happen or neither does: when any grant fails the company is
    /// deleted again and `ProvisioningFailed` is returned.
    #[instrument(name = "provisioning.provision_company", skip(self, company), fields(company = %company.name))]
    pub async fn provision_company(&self, company: &NewCompany) -> AccessResult<Company> {
        let created = self.backend.create_company(company).await?;

        match self.grant_general(created.id).await {
            Ok(0) => {
                warn!(
                    company_id = created.id,
                    "No general permissions defined; company starts without entitlements"
                );
                Ok(created)
            }
            Ok(granted) => {
                info!(company_id = created.id, granted, "Company provisioned");
                Ok(created)
            }
            Err(e) => {
                self.roll_back(&created).await;
                Err(AccessError::ProvisioningFailed {
                    company: created.name,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn grant_general(&self, company_id: CompanyId) -> AccessResult<usize> {
        let names = self.general_permission_names().await?;
        for name in &names {
            self.grants.grant(company_id, name).await?;
        }
        Ok(names.len())
    }

    async fn roll_back(&self, company: &Company) {
        if let Err(e) = self.backend.delete_company(company.id).await {
            error!(
                company_id = company.id,
                error = %e,
                "Failed to roll back partially provisioned company"
            );
        }
        self.cache.invalidate_company(company.id);
    }

    /// Re-apply every General permission to an existing company
    #[instrument(name = "provisioning.provision_existing", skip(self))]
    pub async fn provision_existing(&self, company_id: CompanyId) -> AccessResult<usize> {
        if self.backend.get_company(company_id).await?.is_none() {
            return Err(AccessError::CompanyNotFound(company_id));
        }
        self.grant_general(company_id).await
    }

    /// Grant a General permission to the whole company population.
    ///
    /// Best effort: failures for single companies are logged and reported.
    #[instrument(name = "provisioning.backfill", skip(self))]
    pub async fn backfill(&self, permission: &str) -> AccessResult<BulkGrantReport> {
        let company_ids = self.backend.list_company_ids().await?;
        let report = self.grants.bulk_grant(permission, &company_ids).await?;

        for failure in &report.failed {
            warn!(
                permission,
                company_id = failure.company_id,
                reason = %failure.reason,
                "Back-fill skipped company"
            );
        }

        Ok(report)
    }

    /// Delete a company and forget every cached answer about it
    #[instrument(name = "provisioning.decommission_company", skip(self))]
    pub async fn decommission_company(&self, company_id: CompanyId) -> AccessResult<Company> {
        let company = self
            .backend
            .get_company(company_id)
            .await?
            .ok_or(AccessError::CompanyNotFound(company_id))?;

        self.backend.delete_company(company_id).await?;
        self.cache.invalidate_company(company_id);
        info!(company_id, company = %company.name, "Company removed");

        Ok(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::mock::MockStateBackend;
    use crate::tests::memory::InMemoryBackend;
    use crate::{Error, NewPermission, Permission};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn new_company(name: &str) -> NewCompany {
        NewCompany {
            name: name.to_string(),
            email: format!("{}@example.test", name.to_lowercase()),
            phone: None,
            address: None,
            category_id: None,
            owner_user_id: format!("owner-{name}"),
            owner_name: "Owner".to_string(),
        }
    }

    fn policy(backend: Arc<dyn StateBackend>) -> ProvisioningPolicy {
        let cache = Arc::new(EntitlementCache::default());
        let grants = Arc::new(GrantStore::new(backend.clone(), cache.clone()));
        ProvisioningPolicy::new(backend, grants, cache)
    }

    #[tokio::test]
    async fn test_new_company_receives_general_permissions_only() {
        let backend = Arc::new(InMemoryBackend::default());
        for (name, kind) in [
            ("manage-company", PermissionType::General),
            ("dashboard-access", PermissionType::General),
            ("view-analytics", PermissionType::Unique),
        ] {
            backend
                .create_permission(&NewPermission {
                    name: name.to_string(),
                    permission_type: kind,
                    price: Decimal::ZERO,
                })
                .await
                .unwrap();
        }

        let policy = policy(backend.clone());
        let company = policy.provision_company(&new_company("Acme")).await.unwrap();

        let mut held: Vec<String> = backend
            .list_company_permissions(company.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        held.sort();
        assert_eq!(held, vec!["dashboard-access", "manage-company"]);
    }

    #[tokio::test]
    async fn test_company_without_general_permissions_is_allowed() {
        let backend = Arc::new(InMemoryBackend::default());
        let policy = policy(backend.clone());

        let company = policy.provision_company(&new_company("Solo")).await.unwrap();
        assert!(backend.get_company(company.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_grant_rolls_back_company() {
        let mut backend = MockStateBackend::new();
        let now = Utc::now();

        backend.expect_create_company().returning(move |c| {
            Ok(Company {
                id: 7,
                name: c.name.clone(),
                slug: c.slug(),
                email: c.email.clone(),
                phone: None,
                address: None,
                category_id: None,
                owner_user_id: c.owner_user_id.clone(),
                owner_name: c.owner_name.clone(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
        });
        let general = Permission {
            id: 1,
            name: "manage-company".to_string(),
            permission_type: PermissionType::General,
            price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        let listed = general.clone();
        backend
            .expect_list_permissions()
            .returning(move |_| Ok(vec![listed.clone()]));
        backend
            .expect_get_permission()
            .returning(move |_| Ok(Some(general.clone())));
        backend
            .expect_insert_grant()
            .returning(|_, _| Err(Error::StateError("disk full".to_string())));
        backend
            .expect_delete_company()
            .withf(|id| *id == 7)
            .times(1)
            .returning(|_| Ok(()));

        let policy = policy(Arc::new(backend));
        let result = policy.provision_company(&new_company("Acme")).await;

        match result {
            Err(AccessError::ProvisioningFailed { company, reason }) => {
                assert_eq!(company, "Acme");
                assert!(reason.contains("disk full"));
            }
            other => panic!("expected ProvisioningFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backfill_reaches_existing_companies() {
        let backend = Arc::new(InMemoryBackend::default());
        let a = backend.seed_company("A").await.id;
        let b = backend.seed_company("B").await.id;
        backend
            .create_permission(&NewPermission {
                name: "manage-company".to_string(),
                permission_type: PermissionType::General,
                price: Decimal::ZERO,
            })
            .await
            .unwrap();
        backend.fail_grants_for(b);

        let report = policy(backend.clone())
            .backfill("manage-company")
            .await
            .unwrap();

        assert_eq!(report.granted, vec![a]);
        assert_eq!(report.failed[0].company_id, b);
    }

    #[tokio::test]
    async fn test_decommission_unknown_company() {
        let backend = Arc::new(InMemoryBackend::default());
        let result = policy(backend).decommission_company(404).await;
        assert!(matches!(result, Err(AccessError::CompanyNotFound(404))));
    }
}
