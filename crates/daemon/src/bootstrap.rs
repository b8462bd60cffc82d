//! Startup seeding and reconciliation of the entitlement catalog

use crate::config::SeedConfig;
use crate::error::Result;
use permit_core::access::{AccessError, Entitlements};
use permit_core::{NewPermission, StateBackend, slugify};
use tracing::{info, instrument, warn};

/// What a startup pass changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub permissions_created: Vec<String>,
    pub companies_reconciled: usize,
}

/// Create configured categories and permissions that do not exist yet.
///
/// Existing permissions are left alone so admin edits survive restarts.
#[instrument(name = "bootstrap.seed", skip_all)]
pub async fn seed_catalog(
    backend: &dyn StateBackend,
    entitlements: &Entitlements,
    seed: &SeedConfig,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for name in &seed.categories {
        let slug = slugify(name);
        if slug.is_empty() {
            warn!(category = %name, "Skipping category without a usable slug");
            continue;
        }
        backend.ensure_category(name, &slug).await?;
        report.categories += 1;
    }

    let registry = entitlements.registry();
    for permission in &seed.permissions {
        match registry.get(&permission.name).await {
            Ok(_) => continue,
            Err(AccessError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let created = registry
            .define(NewPermission {
                name: permission.name.clone(),
                permission_type: permission.permission_type,
                price: permission.price,
            })
            .await?;
        report.permissions_created.push(created.name);
    }

    if !report.permissions_created.is_empty() {
        info!(created = ?report.permissions_created, "Seeded permissions");
    }

    Ok(report)
}

/// Re-apply every General permission to every company.
///
/// Heals companies that a failed back-fill skipped. Failures are logged per
/// company and do not stop the pass.
#[instrument(name = "bootstrap.reconcile", skip_all)]
pub async fn reconcile_general_grants(
    backend: &dyn StateBackend,
    entitlements: &Entitlements,
) -> Result<usize> {
    let mut reconciled = 0;
    for company_id in backend.list_company_ids().await? {
        match entitlements
            .provisioning()
            .provision_existing(company_id)
            .await
        {
            Ok(_) => reconciled += 1,
            Err(e) => warn!(company_id, error = %e, "Could not reconcile company grants"),
        }
    }

    info!(companies = reconciled, "General grants reconciled");
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedPermission;
    use permit_core::{NewCompany, PermissionType};
    use permit_sqlx::SqliteStateBackend;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup() -> (Arc<SqliteStateBackend>, Entitlements) {
        let backend = Arc::new(SqliteStateBackend::new("sqlite::memory:").await.unwrap());
        let entitlements = Entitlements::new(backend.clone(), Duration::from_secs(60));
        (backend, entitlements)
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (backend, entitlements) = setup().await;
        let seed = SeedConfig::default();

        let first = seed_catalog(backend.as_ref(), &entitlements, &seed)
            .await
            .unwrap();
        assert_eq!(first.categories, seed.categories.len());
        assert_eq!(first.permissions_created.len(), 3);

        let second = seed_catalog(backend.as_ref(), &entitlements, &seed)
            .await
            .unwrap();
        assert!(second.permissions_created.is_empty());
        assert_eq!(
            backend.list_categories().await.unwrap().len(),
            seed.categories.len()
        );
    }

    #[tokio::test]
    async fn test_seed_keeps_admin_edits() {
        let (backend, entitlements) = setup().await;
        entitlements
            .registry()
            .define(NewPermission {
                name: "view-analytics".to_string(),
                permission_type: PermissionType::Unique,
                price: Decimal::new(42, 0),
            })
            .await
            .unwrap();

        let seed = SeedConfig {
            categories: vec![],
            permissions: vec![SeedPermission {
                name: "view-analytics".to_string(),
                permission_type: PermissionType::Unique,
                price: Decimal::new(500_000, 0),
            }],
        };
        seed_catalog(backend.as_ref(), &entitlements, &seed)
            .await
            .unwrap();

        let kept = entitlements.registry().get("view-analytics").await.unwrap();
        assert_eq!(kept.price, Decimal::new(42, 0));
    }

    #[tokio::test]
    async fn test_reconcile_grants_general_permissions() {
        let (backend, entitlements) = setup().await;
        // Company created behind the engine's back holds nothing
        let company = backend
            .create_company(&NewCompany {
                name: "Acme".to_string(),
                email: "acme@example.test".to_string(),
                phone: None,
                address: None,
                category_id: None,
                owner_user_id: "owner".to_string(),
                owner_name: "Owner".to_string(),
            })
            .await
            .unwrap();
        backend
            .create_permission(&NewPermission {
                name: "manage-company".to_string(),
                permission_type: PermissionType::General,
                price: Decimal::ZERO,
            })
            .await
            .unwrap();

        let reconciled = reconcile_general_grants(backend.as_ref(), &entitlements)
            .await
            .unwrap();
        assert_eq!(reconciled, 1);
        assert!(
            entitlements
                .resolver()
                .can_use(company.id, "manage-company")
                .await
                .unwrap()
        );
    }
}
