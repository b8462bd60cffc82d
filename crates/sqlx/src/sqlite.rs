use crate::common::{
    CategoryRow, CompanyRow, PermissionRow, datetime_to_string, decimal_to_string,
    map_write_error,
};
use async_trait::async_trait;
use chrono::Utc;
use permit_core::{
    Company, CompanyCategory, CompanyFilter, CompanyId, Error, NewCompany, NewPermission,
    Permission, PermissionFilter, Result, StateBackend,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, instrument};

const PERMISSION_COLUMNS: &str = "id, name, permission_type, price, created_at, updated_at";
const COMPANY_COLUMNS: &str = "id, name, slug, email, phone, address, category_id, \
     owner_user_id, owner_name, is_active, created_at, updated_at";

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

pub struct SqliteStateBackend {
    pool: Pool<Sqlite>,
}

impl SqliteStateBackend {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| Error::StateError(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to ":memory:" is its own database
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| Error::StateError(format!("Failed to connect to database: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to run migrations: {e}")))?;

        debug!(database_url, "SQLite state backend ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn company_exists(&self, id: CompanyId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM companies WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to look up company: {e}")))?;
        Ok(found.is_some())
    }

    async fn permission_exists(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to look up permission: {e}")))?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl StateBackend for SqliteStateBackend {
    // Permission catalog
    #[instrument(name = "sqlite.create_permission", skip(self, permission), fields(name = %permission.name))]
    async fn create_permission(&self, permission: &NewPermission) -> Result<Permission> {
        let now = datetime_to_string(Utc::now());

        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "INSERT INTO permissions (name, permission_type, price, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(&permission.name)
        .bind(permission.permission_type.as_str())
        .bind(decimal_to_string(permission.price))
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error("create permission", e))?;

        row.try_into()
    }

    async fn get_permission(&self, name: &str) -> Result<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to get permission: {e}")))?;

        row.map(Permission::try_from).transpose()
    }

    #[instrument(name = "sqlite.update_permission", skip(self, permission), fields(name = %permission.name))]
    async fn update_permission(&self, permission: &Permission) -> Result<()> {
        let result = sqlx::query(
            "UPDATE permissions SET permission_type = ?2, price = ?3, updated_at = ?4 WHERE name = ?1",
        )
        .bind(&permission.name)
        .bind(permission.permission_type.as_str())
        .bind(decimal_to_string(permission.price))
        .bind(datetime_to_string(permission.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to update permission: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::PermissionNotFound(permission.name.clone()));
        }
        Ok(())
    }

    #[instrument(name = "sqlite.delete_permission", skip(self))]
    async fn delete_permission(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to delete permission: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::PermissionNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn list_permissions(&self, filter: &PermissionFilter) -> Result<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions \
             WHERE (?1 IS NULL OR permission_type = ?1) \
             ORDER BY id"
        ))
        .bind(filter.permission_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to list permissions: {e}")))?;

        // SQLite's lower() folds ASCII only, and price is text, so search
        // and ordering both happen after decoding
        let mut permissions = rows
            .into_iter()
            .map(Permission::try_from)
            .filter(|p| p.as_ref().map_or(true, |p| filter.matches(p)))
            .collect::<Result<Vec<_>>>()?;
        filter.sort(&mut permissions);
        Ok(permissions)
    }

    async fn count_permissions(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to count permissions: {e}")))?;
        Ok(count as u64)
    }

    // Company management
    #[instrument(name = "sqlite.create_company", skip(self, company), fields(name = %company.name))]
    async fn create_company(&self, company: &NewCompany) -> Result<Company> {
        let now = datetime_to_string(Utc::now());

        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "INSERT INTO companies (name, slug, email, phone, address, category_id, \
             owner_user_id, owner_name, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9) RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(&company.name)
        .bind(company.slug())
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.address)
        .bind(company.category_id)
        .bind(&company.owner_user_id)
        .bind(&company.owner_name)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error("create company", e))?;

        row.try_into()
    }

    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to get company: {e}")))?;

        row.map(Company::try_from).transpose()
    }

    async fn get_company_by_slug(&self, slug: &str) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE slug = ?1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to get company by slug: {e}")))?;

        row.map(Company::try_from).transpose()
    }

    #[instrument(name = "sqlite.update_company", skip(self, company), fields(id = company.id))]
    async fn update_company(&self, company: &Company) -> Result<()> {
        let result = sqlx::query(
            "UPDATE companies SET name = ?2, email = ?3, phone = ?4, address = ?5, \
             category_id = ?6, is_active = ?7, updated_at = ?8 WHERE id = ?1",
        )
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.address)
        .bind(company.category_id)
        .bind(company.is_active)
        .bind(datetime_to_string(company.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("update company", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::CompanyNotFound(company.id));
        }
        Ok(())
    }

    #[instrument(name = "sqlite.delete_company", skip(self))]
    async fn delete_company(&self, id: CompanyId) -> Result<()> {
        let result = sqlx::query("DELETE FROM companies WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to delete company: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::CompanyNotFound(id));
        }
        Ok(())
    }

    async fn list_companies(&self, filter: &CompanyFilter) -> Result<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies \
             WHERE (?1 IS NULL OR category_id = ?1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to list companies: {e}")))?;

        rows.into_iter()
            .map(Company::try_from)
            .filter(|c| c.as_ref().map_or(true, |c| filter.matches(c)))
            .collect()
    }

    async fn list_company_ids(&self) -> Result<Vec<CompanyId>> {
        sqlx::query_scalar::<_, CompanyId>("SELECT id FROM companies ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to list company ids: {e}")))
    }

    async fn count_companies(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::StateError(format!("Failed to count companies: {e}")))?;
        Ok(count as u64)
    }

    // Company categories
    async fn list_categories(&self) -> Result<Vec<CompanyCategory>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM company_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to list categories: {e}")))?;

        Ok(rows.into_iter().map(CompanyCategory::from).collect())
    }

    async fn ensure_category(&self, name: &str, slug: &str) -> Result<CompanyCategory> {
        sqlx::query(
            "INSERT INTO company_categories (name, slug) VALUES (?1, ?2) \
             ON CONFLICT(slug) DO NOTHING",
        )
        .bind(name)
        .bind(slug)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to create category: {e}")))?;

        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug FROM company_categories WHERE slug = ?1",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to load category: {e}")))?;

        Ok(row.into())
    }

    // Grants
    #[instrument(name = "sqlite.insert_grant", skip(self))]
    async fn insert_grant(&self, company_id: CompanyId, permission: &str) -> Result<bool> {
        if !self.company_exists(company_id).await? {
            return Err(Error::CompanyNotFound(company_id));
        }
        if !self.permission_exists(permission).await? {
            return Err(Error::PermissionNotFound(permission.to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO grants (company_id, permission_name, granted_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(company_id, permission_name) DO NOTHING",
        )
        .bind(company_id)
        .bind(permission)
        .bind(datetime_to_string(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to insert grant: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "sqlite.delete_grant", skip(self))]
    async fn delete_grant(&self, company_id: CompanyId, permission: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM grants WHERE company_id = ?1 AND permission_name = ?2")
                .bind(company_id)
                .bind(permission)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::StateError(format!("Failed to delete grant: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn grant_exists(&self, company_id: CompanyId, permission: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM grants WHERE company_id = ?1 AND permission_name = ?2",
        )
        .bind(company_id)
        .bind(permission)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to check grant: {e}")))?;

        Ok(found.is_some())
    }

    async fn list_company_permissions(&self, company_id: CompanyId) -> Result<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT p.id, p.name, p.permission_type, p.price, p.created_at, p.updated_at \
             FROM permissions p JOIN grants g ON g.permission_name = p.name \
             WHERE g.company_id = ?1 ORDER BY p.id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::StateError(format!("Failed to list company permissions: {e}")))?;

        rows.into_iter().map(Permission::try_from).collect()
    }
}
