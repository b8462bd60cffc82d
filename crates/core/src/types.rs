use crate::errors::Error;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

pub type CompanyId = i64;

/// Whether a permission is handed to every company or sold individually
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    General,
    Unique,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Unique => "unique",
        }
    }
}

impl Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "unique" => Ok(Self::Unique),
            other => Err(Error::InvalidValue(format!(
                "unknown permission type '{other}', expected 'general' or 'unique'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn is_general(&self) -> bool {
        self.permission_type == PermissionType::General
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    pub price: Decimal,
}

/// Replacement attributes for an existing permission.
///
/// `name` is only carried so a rename attempt can be detected and rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSort {
    #[default]
    Insertion,
    Name,
    Price,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub permission_type: Option<PermissionType>,
    pub search: Option<String>,
    pub sort: PermissionSort,
}

impl PermissionFilter {
    pub fn of_type(permission_type: PermissionType) -> Self {
        Self {
            permission_type: Some(permission_type),
            ..Self::default()
        }
    }

    /// Case-insensitive substring match on the name plus exact type match
    pub fn matches(&self, permission: &Permission) -> bool {
        if let Some(kind) = self.permission_type {
            if permission.permission_type != kind {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => permission
                .name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        }
    }

    /// Order a result set the way the filter asks for
    pub fn sort(&self, permissions: &mut [Permission]) {
        match self.sort {
            PermissionSort::Insertion => permissions.sort_by_key(|p| p.id),
            PermissionSort::Name => permissions.sort_by(|a, b| a.name.cmp(&b.name)),
            PermissionSort::Price => {
                permissions.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub slug: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<i64>,
    pub owner_user_id: String,
    pub owner_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to register a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<i64>,
    pub owner_user_id: String,
    pub owner_name: String,
}

impl NewCompany {
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl CompanyUpdate {
    /// Apply the present fields to `company`, leaving its slug untouched
    pub fn apply(self, company: &mut Company) {
        if let Some(name) = self.name {
            company.name = name;
        }
        if let Some(email) = self.email {
            company.email = email;
        }
        if self.phone.is_some() {
            company.phone = self.phone;
        }
        if self.address.is_some() {
            company.address = self.address;
        }
        if self.category_id.is_some() {
            company.category_id = self.category_id;
        }
        if let Some(active) = self.is_active {
            company.is_active = active;
        }
        company.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    /// Matches name or email, case-insensitively
    pub search: Option<String>,
    pub category_id: Option<i64>,
}

impl CompanyFilter {
    pub fn matches(&self, company: &Company) -> bool {
        if let Some(category) = self.category_id {
            if company.category_id != Some(category) {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                company.name.to_lowercase().contains(&term)
                    || company.email.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Lowercase ASCII slug with single dashes between words
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch != '\'' {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(id: i64, name: &str, kind: PermissionType, price: i64) -> Permission {
        Permission {
            id,
            name: name.to_string(),
            permission_type: kind,
            price: Decimal::new(price, 0),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("  Retail & E-commerce "), "retail-e-commerce");
        assert_eq!(slugify("Joe's Coffee"), "joes-coffee");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_permission_type_parsing() {
        assert_eq!("General".parse::<PermissionType>().unwrap(), PermissionType::General);
        assert_eq!("unique".parse::<PermissionType>().unwrap(), PermissionType::Unique);
        assert!("premium".parse::<PermissionType>().is_err());
    }

    #[test]
    fn test_permission_filter_matches_case_insensitively() {
        let p = permission(1, "view-Analytics", PermissionType::Unique, 500_000);

        let filter = PermissionFilter {
            search: Some("ANALYTICS".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&p));

        let filter = PermissionFilter::of_type(PermissionType::General);
        assert!(!filter.matches(&p));

        let filter = PermissionFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&p));
    }

    #[test]
    fn test_permission_filter_sorting() {
        let mut list = vec![
            permission(3, "b", PermissionType::Unique, 10),
            permission(1, "c", PermissionType::General, 0),
            permission(2, "a", PermissionType::Unique, 5),
        ];

        PermissionFilter::default().sort(&mut list);
        assert_eq!(list.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let by_name = PermissionFilter {
            sort: PermissionSort::Name,
            ..Default::default()
        };
        by_name.sort(&mut list);
        assert_eq!(list[0].name, "a");

        let by_price = PermissionFilter {
            sort: PermissionSort::Price,
            ..Default::default()
        };
        by_price.sort(&mut list);
        assert_eq!(list[2].price, Decimal::new(10, 0));
    }

    #[test]
    fn test_company_update_keeps_slug() {
        let mut company = Company {
            id: 1,
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            email: "hello@acme.test".to_string(),
            phone: None,
            address: None,
            category_id: None,
            owner_user_id: "u-1".to_string(),
            owner_name: "Ada".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        CompanyUpdate {
            name: Some("Acme Holdings".to_string()),
            is_active: Some(false),
            ..Default::default()
        }
        .apply(&mut company);

        assert_eq!(company.name, "Acme Holdings");
        assert_eq!(company.slug, "acme");
        assert!(!company.is_active);
    }
}
