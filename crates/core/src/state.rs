use crate::{
    Company, CompanyCategory, CompanyFilter, CompanyId, NewCompany, NewPermission, Permission,
    PermissionFilter, Result,
};
use async_trait::async_trait;

/// Durable storage for the permission catalog, companies and grants.
///
/// Implementations must enforce uniqueness of `Permission::name`, of company
/// slugs and emails, and of `(company_id, permission_name)` grant pairs.
/// Deleting a company or a permission removes every grant that references it.
#[async_trait]
pub trait StateBackend: Send + Sync {
    // Permission catalog
    async fn create_permission(&self, permission: &NewPermission) -> Result<Permission>;
    async fn get_permission(&self, name: &str) -> Result<Option<Permission>>;
    async fn update_permission(&self, permission: &Permission) -> Result<()>;
    async fn delete_permission(&self, name: &str) -> Result<()>;
    async fn list_permissions(&self, filter: &PermissionFilter) -> Result<Vec<Permission>>;
    async fn count_permissions(&self) -> Result<u64>;

    // Company management
    async fn create_company(&self, company: &NewCompany) -> Result<Company>;
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>>;
    async fn get_company_by_slug(&self, slug: &str) -> Result<Option<Company>>;
    async fn update_company(&self, company: &Company) -> Result<()>;
    async fn delete_company(&self, id: CompanyId) -> Result<()>;
    /// Newest registrations first
    async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>>;
    async fn list_company_ids(&self) -> Result<Vec<CompanyId>>;
    async fn count_companies(&self) -> Result<u64>;

    // Company categories
    async fn list_categories(&self) -> Result<Vec<CompanyCategory>>;
    async fn ensure_category(&self, name: &str, slug: &str) -> Result<CompanyCategory>;

    // Grants. `insert_grant` and `delete_grant` report whether a row changed.
    async fn insert_grant(&self, company_id: CompanyId, permission: &str) -> Result<bool>;
    async fn delete_grant(&self, company_id: CompanyId, permission: &str) -> Result<bool>;
    async fn grant_exists(&self, company_id: CompanyId, permission: &str) -> Result<bool>;
    async fn list_company_permissions(&self, company_id: CompanyId) -> Result<Vec<Permission>>;
}

// Mock implementation for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub StateBackend {}

        #[async_trait]
        impl StateBackend for StateBackend {
            async fn create_permission(&self, permission: &NewPermission) -> Result<Permission>;
            async fn get_permission(&self, name: &str) -> Result<Option<Permission>>;
            async fn update_permission(&self, permission: &Permission) -> Result<()>;
            async fn delete_permission(&self, name: &str) -> Result<()>;
            async fn list_permissions(&self, filter: &PermissionFilter) -> Result<Vec<Permission>>;
            async fn count_permissions(&self) -> Result<u64>;
            async fn create_company(&self, company: &NewCompany) -> Result<Company>;
            async fn get_company(&self, id: CompanyId) -> Result<Option<Company>>;
            async fn get_company_by_slug(&self, slug: &str) -> Result<Option<Company>>;
            async fn update_company(&self, company: &Company) -> Result<()>;
            async fn delete_company(&self, id: CompanyId) -> Result<()>;
            async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>>;
            async fn list_company_ids(&self) -> Result<Vec<CompanyId>>;
            async fn count_companies(&self) -> Result<u64>;
            async fn list_categories(&self) -> Result<Vec<CompanyCategory>>;
            async fn ensure_category(&self, name: &str, slug: &str) -> Result<CompanyCategory>;
            async fn insert_grant(&self, company_id: CompanyId, permission: &str) -> Result<bool>;
            async fn delete_grant(&self, company_id: CompanyId, permission: &str) -> Result<bool>;
            async fn grant_exists(&self, company_id: CompanyId, permission: &str) -> Result<bool>;
            async fn list_company_permissions(&self, company_id: CompanyId) -> Result<Vec<Permission>>;
        }
    }
}
