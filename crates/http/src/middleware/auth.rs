//! Bearer authentication.
//!
//! Every routed request except the public ones must carry
//! `Authorization: Bearer <jwt>`. The resulting [`HttpIdentity`] is stored in
//! the request extensions for extractors and the feature gate.

use crate::error::HttpError;
use crate::services::{AuthService, identity::HttpIdentity};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Exact paths reachable without a token
const PUBLIC_PATHS: &[&str] = &["/", "/health", "/api/register", "/openapi.json"];

/// Path prefixes reachable without a token
const PUBLIC_PREFIXES: &[&str] = &["/docs"];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Turns request headers into an identity
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, parts: &Parts) -> Result<HttpIdentity, HttpError>;

    fn should_skip_auth(&self, path: &str) -> bool {
        is_public_path(path)
    }
}

fn authorization_header(parts: &Parts) -> Result<&str, HttpError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| HttpError::AuthenticationFailed("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| {
            HttpError::AuthenticationFailed("Authorization header is not valid text".to_string())
        })
}

#[async_trait]
impl AuthProvider for AuthService {
    async fn authenticate(&self, parts: &Parts) -> Result<HttpIdentity, HttpError> {
        self.authenticate_from_header(authorization_header(parts)?)
    }
}

#[async_trait]
impl<T> AuthProvider for AppState<T>
where
    T: AsRef<Arc<AuthService>> + Send + Sync,
{
    async fn authenticate(&self, parts: &Parts) -> Result<HttpIdentity, HttpError> {
        let auth_service: &Arc<AuthService> = self.data.as_ref().as_ref();
        auth_service.authenticate(parts).await
    }
}

/// Reject unauthenticated requests to non-public routes
pub async fn auth_middleware<T>(
    State(app_state): State<AppState<T>>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError>
where
    AppState<T>: AuthProvider,
    T: Clone + Send + Sync + 'static,
{
    if app_state.should_skip_auth(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();

    let identity = app_state.authenticate(&parts).await.inspect_err(|e| {
        debug!(path = %parts.uri.path(), error = %e, "Rejected unauthenticated request");
    })?;

    trace!(user_id = %identity.id, company_id = ?identity.company_id(), "Request authenticated");
    parts.extensions.insert(identity);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
