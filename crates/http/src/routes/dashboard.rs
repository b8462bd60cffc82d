//! Landing data for the web dashboard

use crate::error::HttpError;
use crate::routes::types::{CompanyInfo, PermissionInfo};
use crate::services::{AuthService, HttpIdentity};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use permit_core::CompanyFilter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Number of registrations shown to administrators
pub const RECENT_COMPANIES: usize = 5;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardResponse {
    Admin {
        companies_total: u64,
        permissions_total: u64,
        recent_companies: Vec<CompanyInfo>,
    },
    Company {
        company: CompanyInfo,
        active_features: usize,
        features: Vec<PermissionInfo>,
    },
}

/// Administrators get platform totals, everyone else their company's features
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Company context not found"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "companies"
)]
#[instrument(name = "dashboard", skip(app_state), fields(user_id = %identity.id))]
pub async fn dashboard<T>(
    identity: HttpIdentity,
    State(app_state): State<AppState<T>>,
) -> Result<Json<DashboardResponse>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let auth_service: &Arc<AuthService> = app_state.data.as_ref().as_ref();

    if auth_service.is_admin(&identity) {
        let backend = &app_state.state_backend;
        let recent_companies = backend
            .list_companies(&CompanyFilter::default())
            .await?
            .into_iter()
            .take(RECENT_COMPANIES)
            .map(CompanyInfo::from)
            .collect();

        return Ok(Json(DashboardResponse::Admin {
            companies_total: backend.count_companies().await?,
            permissions_total: app_state.entitlements.registry().count().await?,
            recent_companies,
        }));
    }

    let company = super::caller_company(&app_state, &identity).await?;
    let features: Vec<PermissionInfo> = app_state
        .entitlements
        .grants()
        .list_grants(company.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(DashboardResponse::Company {
        company: company.into(),
        active_features: features.len(),
        features,
    }))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    OpenApiRouter::new().routes(routes!(dashboard))
}
