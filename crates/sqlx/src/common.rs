//! Row types and conversions for the SQLite backend

use chrono::{DateTime, SecondsFormat, Utc};
use permit_core::{Company, CompanyCategory, Error, Permission, PermissionType, Result};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;

/// Fixed-width RFC 3339 so timestamps order correctly as text
pub fn datetime_to_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn string_to_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::StateError(format!("Invalid timestamp format: {e}")))
}

pub fn decimal_to_string(price: Decimal) -> String {
    format!("{:.2}", price)
}

/// Map a driver error, turning unique violations into `Error::Conflict`
pub fn map_write_error(context: &str, err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(format!("{context}: {}", db.message()))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Error::InvalidValue(format!("{context}: referenced record does not exist"))
        }
        _ => Error::StateError(format!("Failed to {context}: {err}")),
    }
}

#[derive(FromRow)]
pub struct PermissionRow {
    pub id: i64,
    pub name: String,
    pub permission_type: String,
    pub price: String,      // decimal text
    pub created_at: String, // ISO8601 format
    pub updated_at: String, // ISO8601 format
}

#[derive(FromRow)]
pub struct CompanyRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<i64>,
    pub owner_user_id: String,
    pub owner_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = Error;

    fn try_from(row: PermissionRow) -> Result<Self> {
        let price = Decimal::from_str(&row.price).map_err(|e| {
            Error::StateError(format!("Invalid price '{}' for {}: {e}", row.price, row.name))
        })?;

        Ok(Permission {
            id: row.id,
            permission_type: PermissionType::from_str(&row.permission_type)?,
            price,
            created_at: string_to_datetime(&row.created_at)?,
            updated_at: string_to_datetime(&row.updated_at)?,
            name: row.name,
        })
    }
}

impl TryFrom<CompanyRow> for Company {
    type Error = Error;

    fn try_from(row: CompanyRow) -> Result<Self> {
        Ok(Company {
            id: row.id,
            name: row.name,
            slug: row.slug,
            email: row.email,
            phone: row.phone,
            address: row.address,
            category_id: row.category_id,
            owner_user_id: row.owner_user_id,
            owner_name: row.owner_name,
            is_active: row.is_active,
            created_at: string_to_datetime(&row.created_at)?,
            updated_at: string_to_datetime(&row.updated_at)?,
        })
    }
}

impl From<CategoryRow> for CompanyCategory {
    fn from(row: CategoryRow) -> Self {
        CompanyCategory {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::microseconds(1_500);

        let a = datetime_to_string(earlier);
        let b = datetime_to_string(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(string_to_datetime(&b).unwrap(), later);
    }

    #[test]
    fn test_price_text_has_two_decimals() {
        assert_eq!(decimal_to_string(Decimal::new(5, 0)), "5.00");
        assert_eq!(decimal_to_string(Decimal::new(99_999_999_999, 2)), "999999999.99");
    }

    #[test]
    fn test_bad_permission_type_is_rejected() {
        let row = PermissionRow {
            id: 1,
            name: "export".to_string(),
            permission_type: "premium".to_string(),
            price: "1.00".to_string(),
            created_at: "2024-05-01T10:00:00Z".to_string(),
            updated_at: "2024-05-01T10:00:00Z".to_string(),
        };
        assert!(Permission::try_from(row).is_err());
    }
}
