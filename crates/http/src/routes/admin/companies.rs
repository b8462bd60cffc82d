//! Company administration
//!
//! Lookups go by slug, changes by numeric id. Both share the `{company}` path
//! segment.

use super::default_page;
use crate::error::HttpError;
use crate::middleware::AdminIdentity;
use crate::routes::types::{CompanyInfo, Page};
use crate::services::AuthService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use permit_core::{CompanyFilter, CompanyId, CompanyUpdate};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListCompaniesQuery {
    /// Case-insensitive substring of name or email
    pub search: Option<String>,
    /// Category id
    pub category: Option<i64>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    12
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl UpdateCompanyRequest {
    fn validate(self) -> Result<CompanyUpdate, HttpError> {
        let name = match self.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(HttpError::UnprocessableEntity(
                    "name must not be empty".to_string(),
                ));
            }
            other => other.map(str::to_string),
        };

        let email = match self.email.as_deref().map(str::trim) {
            Some(email) if !email.contains('@') => {
                return Err(HttpError::UnprocessableEntity(format!(
                    "'{email}' is not an email address"
                )));
            }
            other => other.map(str::to_lowercase),
        };

        Ok(CompanyUpdate {
            name,
            email,
            phone: self.phone,
            address: self.address,
            category_id: self.category_id,
            is_active: self.is_active,
        })
    }
}

fn parse_company_id(raw: &str) -> Result<CompanyId, HttpError> {
    raw.parse()
        .map_err(|_| HttpError::BadRequest(format!("'{raw}' is not a company id")))
}

/// List companies, newest first (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/companies",
    params(ListCompaniesQuery),
    responses(
        (status = 200, description = "One page of companies", body = Page<CompanyInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(
    name = "list_companies",
    skip(app_state, _admin),
    fields(
        page = %query.page,
        page_size = %query.page_size,
        search = ?query.search
    )
)]
pub async fn list_companies<T>(
    _admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Query(query): Query<ListCompaniesQuery>,
) -> Result<Json<Page<CompanyInfo>>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let companies = app_state
        .state_backend
        .list_companies(&CompanyFilter {
            search: query.search,
            category_id: query.category,
        })
        .await?;

    Ok(Json(
        Page::slice(companies, query.page, query.page_size).map(CompanyInfo::from),
    ))
}

/// Get a company by slug (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/companies/{company}",
    params(
        ("company" = String, Path, description = "Company slug")
    ),
    responses(
        (status = 200, description = "Company details", body = CompanyInfo),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Company not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "get_company", skip(app_state, _admin))]
pub async fn get_company<T>(
    _admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(company): Path<String>,
) -> Result<Json<CompanyInfo>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    app_state
        .state_backend
        .get_company_by_slug(&company)
        .await?
        .map(|c| Json(c.into()))
        .ok_or_else(|| HttpError::NotFound(format!("Company '{company}'")))
}

/// Update company details (admin only). The slug never changes.
#[utoipa::path(
    put,
    path = "/api/admin/companies/{company}",
    params(
        ("company" = i64, Path, description = "Company ID")
    ),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = CompanyInfo),
        (status = 400, description = "Malformed company id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid company data or unknown category"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "update_company", skip(app_state, admin, request), fields(admin_id = %admin.id))]
pub async fn update_company<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(company): Path<String>,
    Json(request): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyInfo>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let company_id = parse_company_id(&company)?;
    let changes = request.validate()?;
    crate::routes::check_category(&app_state, changes.category_id).await?;

    let backend = &app_state.state_backend;
    let mut existing = backend
        .get_company(company_id)
        .await?
        .ok_or(permit_core::Error::CompanyNotFound(company_id))?;

    let reactivated = !existing.is_active && changes.is_active == Some(true);
    changes.apply(&mut existing);
    backend.update_company(&existing).await?;
    info!(company_id, "Company updated");

    // General permissions defined while the company was inactive
    if reactivated {
        let granted = app_state
            .entitlements
            .provisioning()
            .provision_existing(company_id)
            .await?;
        info!(company_id, granted, "Company re-activated");
    }

    Ok(Json(existing.into()))
}

/// Delete a company together with its grants (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/companies/{company}",
    params(
        ("company" = i64, Path, description = "Company ID")
    ),
    responses(
        (status = 200, description = "Company deleted", body = CompanyInfo),
        (status = 400, description = "Malformed company id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Company not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "delete_company", skip(app_state, admin), fields(admin_id = %admin.id))]
pub async fn delete_company<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(company): Path<String>,
) -> Result<Json<CompanyInfo>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let company_id = parse_company_id(&company)?;
    let removed = app_state
        .entitlements
        .provisioning()
        .decommission_company(company_id)
        .await?;

    Ok(Json(removed.into()))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    OpenApiRouter::new()
        .routes(routes!(list_companies))
        .routes(routes!(get_company, update_company, delete_company))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_validation() {
        let ok = UpdateCompanyRequest {
            name: Some(" Acme Two ".to_string()),
            email: Some("Ops@Acme.test".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(ok.name.as_deref(), Some("Acme Two"));
        assert_eq!(ok.email.as_deref(), Some("ops@acme.test"));

        let blank = UpdateCompanyRequest {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        let bad_email = UpdateCompanyRequest {
            email: Some("nobody".to_string()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_parse_company_id() {
        assert_eq!(parse_company_id("42").unwrap(), 42);
        assert!(parse_company_id("acme").is_err());
    }
}
