//! Feature gate middleware.
//!
//! Each protected route is wrapped with a [`FeatureGate`] naming the one
//! permission it needs. The caller's company must hold it; anything else is a
//! 403 with a message fit for end users.

use crate::error::HttpError;
use crate::services::identity::HttpIdentity;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use permit_core::Company;
use std::sync::Arc;

/// Middleware state: the app state plus the permission a route requires
#[derive(Clone)]
pub struct FeatureGate<T> {
    app_state: AppState<T>,
    permission: Arc<str>,
}

impl<T> FeatureGate<T> {
    pub fn new(app_state: AppState<T>, permission: impl Into<Arc<str>>) -> Self {
        Self {
            app_state,
            permission: permission.into(),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

/// Inserted into request extensions once the gate lets a request through
#[derive(Debug, Clone)]
pub struct GrantedFeature {
    pub permission: String,
    pub company: Company,
}

pub async fn require_feature<T>(
    State(gate): State<FeatureGate<T>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError>
where
    T: Clone + Send + Sync + 'static,
{
    let identity = req
        .extensions()
        .get::<HttpIdentity>()
        .cloned()
        .ok_or_else(|| HttpError::AuthenticationFailed("User not authenticated".to_string()))?;

    let company = gate
        .app_state
        .entitlements
        .gate()
        .check(&identity.0, gate.permission())
        .await
        .inspect_err(|e| {
            info!(
                user_id = %identity.id,
                permission = gate.permission(),
                reason = %e,
                "Feature access denied"
            );
        })?;

    req.extensions_mut().insert(GrantedFeature {
        permission: gate.permission().to_string(),
        company,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::HttpContext;
    use axum::{Router, body::Body, http::StatusCode, middleware::from_fn, routing::get};
    use permit_core::{NewPermission, PermissionType};
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    async fn app(identity: Option<HttpIdentity>) -> (AppState, Router) {
        let state = AppState::default();
        state
            .entitlements
            .registry()
            .define(NewPermission {
                name: "view-analytics".to_string(),
                permission_type: PermissionType::Unique,
                price: Decimal::new(500_000, 0),
            })
            .await
            .unwrap();

        let gate = FeatureGate::new(state.clone(), "view-analytics");
        let router = Router::new()
            .route(
                "/analytics",
                get(|| async { "ok" }).route_layer(axum::middleware::from_fn_with_state(
                    gate,
                    require_feature::<()>,
                )),
            )
            .layer(from_fn(move |mut req: Request, next: Next| {
                let identity = identity.clone();
                async move {
                    if let Some(identity) = identity {
                        req.extensions_mut().insert(identity);
                    }
                    next.run(req).await
                }
            }));
        (state, router)
    }

    fn subject(company_id: i64) -> HttpIdentity {
        HttpIdentity::new(
            "user-1".to_string(),
            "test".to_string(),
            HttpContext::new().with_company(company_id),
        )
    }

    async fn status(router: &Router) -> StatusCode {
        let request = axum::http::Request::get("/analytics")
            .body(Body::empty())
            .unwrap();
        router.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_unauthenticated_request_is_rejected() {
        let (_, router) = app(None).await;
        assert_eq!(status(&router).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_gate_tracks_grants() {
        // First company in a fresh backend gets id 1
        let (state, router) = app(Some(subject(1))).await;
        let company = state
            .state_backend
            .create_company(&permit_core::NewCompany {
                name: "Acme".to_string(),
                email: "acme@example.test".to_string(),
                phone: None,
                address: None,
                category_id: None,
                owner_user_id: "owner".to_string(),
                owner_name: "Owner".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(company.id, 1);

        assert_eq!(status(&router).await, StatusCode::FORBIDDEN);

        state
            .entitlements
            .grants()
            .grant(company.id, "view-analytics")
            .await
            .unwrap();
        assert_eq!(status(&router).await, StatusCode::OK);

        state
            .entitlements
            .grants()
            .revoke(company.id, "view-analytics")
            .await
            .unwrap();
        assert_eq!(status(&router).await, StatusCode::FORBIDDEN);
    }
}
