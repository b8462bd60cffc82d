//! Per-company grant overview and toggles

use super::default_page;
use crate::error::HttpError;
use crate::middleware::AdminIdentity;
use crate::routes::types::{CompanyInfo, Page, PermissionInfo};
use crate::services::AuthService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use permit_core::access::{AccessError, AccessResult, GrantStore};
use permit_core::{Company, CompanyFilter, CompanyId, PermissionFilter, PermissionType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CompanyAccessQuery {
    /// Case-insensitive substring of the company name
    pub search: Option<String>,
    /// `unique`: holds at least one Unique permission. `general`: holds none.
    #[serde(rename = "type")]
    #[param(value_type = Option<String>)]
    pub permission_type: Option<PermissionType>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CompanyAccess {
    pub company: CompanyInfo,
    pub permissions: Vec<PermissionInfo>,
    pub has_unique: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CompanyAccessResponse {
    pub companies: Page<CompanyAccess>,
    pub unique_permissions: Vec<PermissionInfo>,
    pub general_permissions: Vec<PermissionInfo>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ToggleAccessRequest {
    pub permission_name: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ToggleAccessResponse {
    pub company_id: CompanyId,
    pub permission_name: String,
    pub enabled: bool,
    pub message: String,
}

/// `None` when the company disappeared after it was listed
async fn company_access(
    grants: &GrantStore,
    company: Company,
) -> AccessResult<Option<CompanyAccess>> {
    let permissions = match grants.list_grants(company.id).await {
        Ok(permissions) => permissions,
        Err(AccessError::CompanyNotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    Ok(Some(CompanyAccess {
        has_unique: permissions.iter().any(|p| !p.is_general()),
        company: company.into(),
        permissions: permissions.into_iter().map(Into::into).collect(),
    }))
}

/// Companies by name with the permissions they hold (admin only).
///
/// Without a type filter grants are only loaded for the requested page.
#[utoipa::path(
    get,
    path = "/api/admin/company-access",
    params(CompanyAccessQuery),
    responses(
        (status = 200, description = "Companies with their grants and both catalogs", body = CompanyAccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "list_company_access", skip(app_state, _admin))]
pub async fn list_company_access<T>(
    _admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Query(query): Query<CompanyAccessQuery>,
) -> Result<Json<CompanyAccessResponse>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let term = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);
    let mut companies = app_state
        .state_backend
        .list_companies(&CompanyFilter::default())
        .await?;
    companies.retain(|c| term.as_deref().is_none_or(|t| c.name.to_lowercase().contains(t)));
    companies.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let grants = app_state.entitlements.grants();
    let page = match query.permission_type {
        None => {
            let page = Page::slice(companies, query.page, query.page_size);
            let mut items = Vec::with_capacity(page.items.len());
            for company in page.items {
                items.extend(company_access(grants, company).await?);
            }
            Page {
                items,
                total: page.total,
                page: page.page,
                page_size: page.page_size,
            }
        }
        Some(kind) => {
            let mut rows = Vec::new();
            for company in companies {
                if let Some(row) = company_access(grants, company).await? {
                    let keep = match kind {
                        PermissionType::Unique => row.has_unique,
                        PermissionType::General => !row.has_unique,
                    };
                    if keep {
                        rows.push(row);
                    }
                }
            }
            Page::slice(rows, query.page, query.page_size)
        }
    };

    let registry = app_state.entitlements.registry();
    let unique_permissions = registry
        .list(&PermissionFilter::of_type(PermissionType::Unique))
        .await?;
    let general_permissions = registry
        .list(&PermissionFilter::of_type(PermissionType::General))
        .await?;

    Ok(Json(CompanyAccessResponse {
        companies: page,
        unique_permissions: unique_permissions.into_iter().map(Into::into).collect(),
        general_permissions: general_permissions.into_iter().map(Into::into).collect(),
    }))
}

/// Grant or revoke one permission for one company (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/company-access/{company_id}",
    params(
        ("company_id" = i64, Path, description = "Company ID")
    ),
    request_body = ToggleAccessRequest,
    responses(
        (status = 200, description = "Grant changed", body = ToggleAccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Company or permission not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(
    name = "toggle_company_access",
    skip(app_state, admin, request),
    fields(
        admin_id = %admin.id,
        permission = %request.permission_name,
        enabled = request.enabled
    )
)]
pub async fn toggle_company_access<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(company_id): Path<CompanyId>,
    Json(request): Json<ToggleAccessRequest>,
) -> Result<Json<ToggleAccessResponse>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let company = app_state
        .state_backend
        .get_company(company_id)
        .await?
        .ok_or(AccessError::CompanyNotFound(company_id))?;

    let grants = app_state.entitlements.grants();
    let message = if request.enabled {
        grants.grant(company.id, &request.permission_name).await?;
        format!(
            "Access '{}' granted to {}.",
            request.permission_name, company.name
        )
    } else {
        grants.revoke(company.id, &request.permission_name).await?;
        format!(
            "Access '{}' revoked from {}.",
            request.permission_name, company.name
        )
    };

    Ok(Json(ToggleAccessResponse {
        company_id: company.id,
        permission_name: request.permission_name,
        enabled: request.enabled,
        message,
    }))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    OpenApiRouter::new()
        .routes(routes!(list_company_access))
        .routes(routes!(toggle_company_access))
}
