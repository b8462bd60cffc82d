use super::cache::EntitlementCache;
use super::error::{AccessError, AccessResult};
use super::provisioning::ProvisioningPolicy;
use crate::{
    Error, NewPermission, Permission, PermissionChanges, PermissionFilter, PermissionType,
    StateBackend,
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Longest accepted permission name, in characters
pub const MAX_NAME_LEN: usize = 255;

/// 999 999 999.99
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_215_752_191, 23, 0, false, 2);

/// Catalog of permission definitions
pub struct PermissionRegistry {
    backend: Arc<dyn StateBackend>,
    provisioning: Arc<ProvisioningPolicy>,
    cache: Arc<EntitlementCache>,
}

fn validate_name(name: &str) -> AccessResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccessError::InvalidName("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AccessError::InvalidName(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Range is checked on the value as given; rounding happens only after.
/// A sign bit on zero counts as negative.
fn validate_price(price: Decimal) -> AccessResult<Decimal> {
    if price.is_sign_negative() || price > MAX_PRICE {
        return Err(AccessError::InvalidPrice(price));
    }
    let mut rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    Ok(rounded)
}

impl PermissionRegistry {
    pub fn new(
        backend: Arc<dyn StateBackend>,
        provisioning: Arc<ProvisioningPolicy>,
        cache: Arc<EntitlementCache>,
    ) -> Self {
        Self {
            backend,
            provisioning,
            cache,
        }
    }

    /// Register a new permission.
    ///
    /// General permissions are granted to every existing company before this
    /// returns. Back-fill failures are logged and do not undo the definition.
    #[instrument(name = "registry.define", skip(self, permission), fields(name = %permission.name, permission_type = %permission.permission_type))]
    pub async fn define(&self, permission: NewPermission) -> AccessResult<Permission> {
        let name = validate_name(&permission.name)?;
        let price = validate_price(permission.price)?;

        if self.backend.get_permission(&name).await?.is_some() {
            return Err(AccessError::DuplicateName(name));
        }

        let created = self
            .backend
            .create_permission(&NewPermission {
                name: name.clone(),
                permission_type: permission.permission_type,
                price,
            })
            .await
            .map_err(|e| match e {
                Error::Conflict(_) => AccessError::DuplicateName(name.clone()),
                other => other.into(),
            })?;

        info!(name = %created.name, price = %created.price, "Permission defined");

        if created.is_general() {
            self.backfill(&created.name).await;
        }

        Ok(created)
    }

    /// Replace type and price of an existing permission
    #[instrument(name = "registry.update", skip(self, changes))]
    pub async fn update(&self, name: &str, changes: PermissionChanges) -> AccessResult<Permission> {
        let mut permission = self.get(name).await?;

        if let Some(requested) = changes.name.as_deref().map(str::trim) {
            if requested != permission.name {
                return Err(AccessError::ImmutableName {
                    current: permission.name,
                    requested: requested.to_string(),
                });
            }
        }

        let promoted =
            !permission.is_general() && changes.permission_type == PermissionType::General;

        permission.permission_type = changes.permission_type;
        permission.price = validate_price(changes.price)?;
        permission.updated_at = Utc::now();

        self.backend.update_permission(&permission).await?;
        info!(
            permission_type = %permission.permission_type,
            price = %permission.price,
            "Permission updated"
        );

        if promoted {
            self.backfill(&permission.name).await;
        }

        Ok(permission)
    }

    /// Delete a permission and every grant that references it
    #[instrument(name = "registry.remove", skip(self))]
    pub async fn remove(&self, name: &str) -> AccessResult<()> {
        let permission = self.get(name).await?;

        self.backend.delete_permission(&permission.name).await?;
        self.cache.invalidate_permission(&permission.name);
        info!("Permission removed");

        Ok(())
    }

    pub async fn get(&self, name: &str) -> AccessResult<Permission> {
        self.backend
            .get_permission(name)
            .await?
            .ok_or_else(|| AccessError::NotFound(name.to_string()))
    }

    pub async fn list(&self, filter: &PermissionFilter) -> AccessResult<Vec<Permission>> {
        Ok(self.backend.list_permissions(filter).await?)
    }

    pub async fn count(&self) -> AccessResult<u64> {
        Ok(self.backend.count_permissions().await?)
    }

    async fn backfill(&self, name: &str) {
        match self.provisioning.backfill(name).await {
            Ok(report) => info!(
                granted = report.granted.len(),
                failed = report.failed.len(),
                "General permission back-filled"
            ),
            Err(e) => warn!(error = %e, "Back-fill of general permission failed"),
        }
    }
}
