//! Permission catalog administration

use super::default_page;
use crate::error::HttpError;
use crate::middleware::AdminIdentity;
use crate::routes::types::{Page, PermissionInfo};
use crate::services::AuthService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use permit_core::access::BulkGrantReport;
use permit_core::{
    CompanyId, NewPermission, PermissionChanges, PermissionFilter, PermissionSort, PermissionType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListPermissionsQuery {
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    /// `general` or `unique`
    #[serde(rename = "type")]
    #[param(value_type = Option<String>)]
    pub permission_type: Option<PermissionType>,
    /// `name`, `price` or `insertion`
    #[param(value_type = Option<String>)]
    pub sort: Option<PermissionSort>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreatePermissionRequest {
    pub name: String,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "general")]
    pub permission_type: PermissionType,
    #[schema(value_type = String, example = "0.00")]
    pub price: Decimal,
}

/// Replacement values. `name` may be sent but must equal the current name.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdatePermissionRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "unique")]
    pub permission_type: PermissionType,
    #[schema(value_type = String, example = "500000.00")]
    pub price: Decimal,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct BulkGrantRequest {
    /// Companies to grant to; empty means every company
    #[serde(default)]
    pub company_ids: Vec<CompanyId>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BulkGrantFailureInfo {
    pub company_id: CompanyId,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BulkGrantResponse {
    pub permission: String,
    pub granted: Vec<CompanyId>,
    pub failed: Vec<BulkGrantFailureInfo>,
}

impl From<BulkGrantReport> for BulkGrantResponse {
    fn from(report: BulkGrantReport) -> Self {
        Self {
            permission: report.permission,
            granted: report.granted,
            failed: report
                .failed
                .into_iter()
                .map(|f| BulkGrantFailureInfo {
                    company_id: f.company_id,
                    reason: f.reason,
                })
                .collect(),
        }
    }
}

/// List permissions (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    params(ListPermissionsQuery),
    responses(
        (status = 200, description = "One page of permissions", body = Page<PermissionInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(
    name = "list_permissions",
    skip(app_state, _admin),
    fields(
        page = %query.page,
        page_size = %query.page_size,
        search = ?query.search
    )
)]
pub async fn list_permissions<T>(
    _admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Query(query): Query<ListPermissionsQuery>,
) -> Result<Json<Page<PermissionInfo>>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let filter = PermissionFilter {
        permission_type: query.permission_type,
        search: query.search,
        sort: query.sort.unwrap_or_default(),
    };
    let permissions = app_state.entitlements.registry().list(&filter).await?;

    Ok(Json(
        Page::slice(permissions, query.page, query.page_size).map(PermissionInfo::from),
    ))
}

/// Define a permission (admin only)
///
/// General permissions are granted to every existing company right away.
#[utoipa::path(
    post,
    path = "/api/admin/permissions",
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Permission created", body = PermissionInfo),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 409, description = "Name already taken"),
        (status = 422, description = "Invalid name or price"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(
    name = "create_permission",
    skip(app_state, admin, request),
    fields(admin_id = %admin.id, name = %request.name)
)]
pub async fn create_permission<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Json(request): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<PermissionInfo>), HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let created = app_state
        .entitlements
        .registry()
        .define(NewPermission {
            name: request.name,
            permission_type: request.permission_type,
            price: request.price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get one permission (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/permissions/{name}",
    params(
        ("name" = String, Path, description = "Permission name")
    ),
    responses(
        (status = 200, description = "Permission details", body = PermissionInfo),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Permission not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "get_permission", skip(app_state, _admin))]
pub async fn get_permission<T>(
    _admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(name): Path<String>,
) -> Result<Json<PermissionInfo>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let permission = app_state.entitlements.registry().get(&name).await?;
    Ok(Json(permission.into()))
}

/// Change type and price of a permission (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/permissions/{name}",
    params(
        ("name" = String, Path, description = "Permission name")
    ),
    request_body = UpdatePermissionRequest,
    responses(
        (status = 200, description = "Permission updated", body = PermissionInfo),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Permission not found"),
        (status = 422, description = "Rename attempted or invalid price"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "update_permission", skip(app_state, admin, request), fields(admin_id = %admin.id))]
pub async fn update_permission<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(name): Path<String>,
    Json(request): Json<UpdatePermissionRequest>,
) -> Result<Json<PermissionInfo>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let updated = app_state
        .entitlements
        .registry()
        .update(
            &name,
            PermissionChanges {
                name: request.name,
                permission_type: request.permission_type,
                price: request.price,
            },
        )
        .await?;

    Ok(Json(updated.into()))
}

/// Delete a permission and all of its grants (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/permissions/{name}",
    params(
        ("name" = String, Path, description = "Permission name")
    ),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Permission not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "delete_permission", skip(app_state, admin), fields(admin_id = %admin.id))]
pub async fn delete_permission<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(name): Path<String>,
) -> Result<StatusCode, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    app_state.entitlements.registry().remove(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grant a permission to many companies at once (admin only)
///
/// Companies that fail are listed in the response; the rest keep their grant.
#[utoipa::path(
    post,
    path = "/api/admin/permissions/{name}/bulk-grant",
    params(
        ("name" = String, Path, description = "Permission name")
    ),
    request_body = BulkGrantRequest,
    responses(
        (status = 200, description = "Per-company outcome", body = BulkGrantResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Permission not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(
    name = "bulk_grant_permission",
    skip(app_state, admin, request),
    fields(admin_id = %admin.id, companies = request.company_ids.len())
)]
pub async fn bulk_grant_permission<T>(
    admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
    Path(name): Path<String>,
    Json(request): Json<BulkGrantRequest>,
) -> Result<Json<BulkGrantResponse>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let company_ids = if request.company_ids.is_empty() {
        app_state.state_backend.list_company_ids().await?
    } else {
        request.company_ids
    };

    let report = app_state
        .entitlements
        .grants()
        .bulk_grant(&name, &company_ids)
        .await?;

    if !report.is_complete() {
        warn!(
            permission = %name,
            failed = report.failed.len(),
            "Bulk grant finished with failures"
        );
    }

    Ok(Json(report.into()))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    OpenApiRouter::new()
        .routes(routes!(list_permissions, create_permission))
        .routes(routes!(get_permission, update_permission, delete_permission))
        .routes(routes!(bulk_grant_permission))
}
