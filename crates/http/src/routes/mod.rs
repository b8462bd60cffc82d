//! API route definitions
use crate::error::HttpError;
use crate::services::{AuthService, HttpIdentity};
use crate::state::AppState;
use permit_core::Company;
use permit_core::access::{AccessError, ForbiddenReason};
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;

pub mod admin;
pub mod dashboard;
pub mod features;
pub mod health;
pub mod me;
pub mod register;
pub mod types;

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerAuth),
    components(
        schemas(crate::error::ErrorResponse)
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "companies", description = "Company registration and self service"),
        (name = "features", description = "Entitlement gated features"),
        (name = "admin", description = "Permission catalog and grant administration"),
    ),
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Base router carrying the OpenAPI document
pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Send + Sync + Clone + 'static,
{
    OpenApiRouter::with_openapi(ApiDoc::openapi())
}

/// Every documented route of the service
pub fn api_router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Send + Sync + Clone + 'static + AsRef<Arc<AuthService>>,
{
    let router = router::<T>()
        .merge(health::router::<T>())
        .merge(register::router::<T>())
        .merge(dashboard::router::<T>())
        .merge(me::router::<T>());

    admin::add_routes(router)
}

/// Resolve the company the caller acts for.
///
/// Missing, malformed or dangling company ids all read as "no company
/// context", the same way the feature gate treats them.
pub(crate) async fn caller_company<T>(
    app_state: &AppState<T>,
    identity: &HttpIdentity,
) -> Result<Company, HttpError> {
    let no_context = || HttpError::from(AccessError::Forbidden(ForbiddenReason::NoCompanyContext));

    let company_id = identity.company_id().ok_or_else(no_context)?;
    app_state
        .state_backend
        .get_company(company_id)
        .await
        .map_err(|e| {
            warn!(company_id, error = %e, "Company lookup failed");
            no_context()
        })?
        .ok_or_else(no_context)
}

/// Reject a reference to a company category that does not exist
pub(crate) async fn check_category<T>(
    app_state: &AppState<T>,
    category_id: Option<i64>,
) -> Result<(), HttpError> {
    let Some(id) = category_id else {
        return Ok(());
    };

    let categories = app_state.state_backend.list_categories().await?;
    if categories.iter().any(|c| c.id == id) {
        Ok(())
    } else {
        Err(HttpError::UnprocessableEntity(format!(
            "Company category {id} does not exist"
        )))
    }
}
