//! Feature routes protected by the entitlement gate.
//!
//! Paths and the permission each one requires come from configuration, so
//! these routes are built at startup against a concrete state and are not part
//! of the OpenAPI document.

use crate::middleware::entitlement::{FeatureGate, GrantedFeature, require_feature};
use crate::state::AppState;
use axum::{Extension, Router, middleware::from_fn_with_state, response::Json, routing::get};
use permit_core::CompanyId;
use serde::{Deserialize, Serialize};

/// A path and the permission a company needs to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRoute {
    pub path: String,
    pub permission: String,
}

impl FeatureRoute {
    pub fn new(path: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            permission: permission.into(),
        }
    }

    /// `/api/features/<permission>`
    pub fn for_permission(permission: &str) -> Self {
        Self::new(format!("/api/features/{permission}"), permission)
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FeatureResponse {
    pub feature: String,
    pub company_id: CompanyId,
    pub company_name: String,
    pub message: String,
}

async fn feature_granted(Extension(granted): Extension<GrantedFeature>) -> Json<FeatureResponse> {
    Json(FeatureResponse {
        message: format!(
            "Feature '{}' is available for {}.",
            granted.permission, granted.company.name
        ),
        feature: granted.permission,
        company_id: granted.company.id,
        company_name: granted.company.name,
    })
}

/// One GET route per configured feature, each behind its own gate
pub fn router<T>(state: &AppState<T>, features: &[FeatureRoute]) -> Router<AppState<T>>
where
    T: Clone + Send + Sync + 'static,
{
    features.iter().fold(Router::new(), |router, feature| {
        debug!(path = %feature.path, permission = %feature.permission, "Registering feature route");
        let gate = FeatureGate::new(state.clone(), feature.permission.as_str());
        router.route(
            &feature.path,
            get(feature_granted).route_layer(from_fn_with_state(gate, require_feature::<T>)),
        )
    })
}
