//! Company category listing

use crate::error::HttpError;
use crate::middleware::AdminIdentity;
use crate::routes::types::CategoryInfo;
use crate::services::AuthService;
use crate::state::AppState;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

/// List company categories by name
#[utoipa::path(
    get,
    path = "/api/admin/categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "admin"
)]
#[instrument(name = "list_categories", skip(app_state, _admin))]
pub async fn list_categories<T>(
    _admin: AdminIdentity,
    State(app_state): State<AppState<T>>,
) -> Result<Json<Vec<CategoryInfo>>, HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let categories = app_state.state_backend.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    OpenApiRouter::new().routes(routes!(list_categories))
}
