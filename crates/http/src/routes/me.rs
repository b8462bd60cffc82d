//! Self service for company users

use crate::error::HttpError;
use crate::routes::types::PermissionInfo;
use crate::services::HttpIdentity;
use crate::state::AppState;
use axum::{extract::State, response::Json};
use permit_core::CompanyId;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MyPermissionsResponse {
    pub company_id: CompanyId,
    pub company_name: String,
    pub permissions: Vec<PermissionInfo>,
}

/// Permissions held by the caller's company
#[utoipa::path(
    get,
    path = "/api/me/permissions",
    responses(
        (status = 200, description = "Entitlements of the caller's company", body = MyPermissionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Company context not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "companies"
)]
#[instrument(name = "my_permissions", skip(app_state), fields(user_id = %identity.id))]
pub async fn my_permissions<T>(
    identity: HttpIdentity,
    State(app_state): State<AppState<T>>,
) -> Result<Json<MyPermissionsResponse>, HttpError>
where
    T: Clone + Send + Sync + 'static,
{
    let company = super::caller_company(&app_state, &identity).await?;
    let permissions = app_state
        .entitlements
        .grants()
        .list_grants(company.id)
        .await?;

    Ok(Json(MyPermissionsResponse {
        company_id: company.id,
        company_name: company.name,
        permissions: permissions.into_iter().map(Into::into).collect(),
    }))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static,
{
    OpenApiRouter::new().routes(routes!(my_permissions))
}
