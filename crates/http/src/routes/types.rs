//! Wire representations shared by several route modules

use chrono::{DateTime, Utc};
use permit_core::{Company, CompanyCategory, CompanyId, Permission, PermissionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Permission definition as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionInfo {
    pub id: i64,
    pub name: String,
    /// `general` or `unique`
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "unique")]
    pub permission_type: PermissionType,
    /// Decimal with two fractional digits, serialized as a string
    #[schema(value_type = String, example = "500000.00")]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Permission> for PermissionInfo {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            permission_type: permission.permission_type,
            price: permission.price,
            created_at: permission.created_at,
            updated_at: permission.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyInfo {
    pub id: CompanyId,
    pub name: String,
    pub slug: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub owner_user_id: String,
    pub owner_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Company> for CompanyInfo {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            slug: company.slug,
            email: company.email,
            phone: company.phone,
            address: company.address,
            category_id: company.category_id,
            owner_user_id: company.owner_user_id,
            owner_name: company.owner_name,
            is_active: company.is_active,
            created_at: company.created_at,
            updated_at: company.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryInfo {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<CompanyCategory> for CategoryInfo {
    fn from(category: CompanyCategory) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
        }
    }
}

/// One page of a listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub const MAX_PAGE_SIZE: usize = 100;

    /// Cut page `page` (1-based) out of `all`
    pub fn slice(all: Vec<T>, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.clamp(1, Self::MAX_PAGE_SIZE);
        let total = all.len();
        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Self {
            items,
            total,
            page,
            page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
