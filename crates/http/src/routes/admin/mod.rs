//! Administration routes. Every handler takes an [`AdminIdentity`], so callers
//! without one of the configured admin roles get a 403.
//!
//! [`AdminIdentity`]: crate::middleware::AdminIdentity

use crate::services::AuthService;
use crate::state::AppState;
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;

pub mod categories;
pub mod companies;
pub mod company_access;
pub mod permissions;

pub fn add_routes<T>(router: OpenApiRouter<AppState<T>>) -> OpenApiRouter<AppState<T>>
where
    T: Send + Sync + Clone + 'static + AsRef<Arc<AuthService>>,
{
    router
        .merge(permissions::router::<T>())
        .merge(company_access::router::<T>())
        .merge(companies::router::<T>())
        .merge(categories::router::<T>())
}

fn default_page() -> usize {
    1
}
