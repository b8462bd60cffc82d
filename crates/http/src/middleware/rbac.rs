//! Role-based access control

use crate::error::HttpError;
use crate::services::{AuthService, identity::HttpIdentity};
use crate::state::AppState;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::ops::Deref;
use std::sync::Arc;

/// Helper function to check if user has required roles
pub fn check_roles(user: &HttpIdentity, required_roles: &[String]) -> Result<(), HttpError> {
    if !user.context.has_any_role(required_roles) {
        return Err(HttpError::AuthorizationFailed(format!(
            "Access denied. Required roles: {:?}, user roles: {:?}",
            required_roles,
            user.roles()
        )));
    }

    Ok(())
}

/// Helper function to check if user has admin role
pub fn check_admin_role(user: &HttpIdentity, admin_roles: &[String]) -> Result<(), HttpError> {
    if !user.context.has_any_role(admin_roles) {
        return Err(HttpError::AuthorizationFailed(
            "Admin access required".to_string(),
        ));
    }

    Ok(())
}

/// Extractor for handlers that only administrators may call.
///
/// Relies on `auth_middleware` having placed an [`HttpIdentity`] in the
/// request extensions.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub HttpIdentity);

impl Deref for AdminIdentity {
    type Target = HttpIdentity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> FromRequestParts<AppState<T>> for AdminIdentity
where
    T: AsRef<Arc<AuthService>> + Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<T>,
    ) -> Result<Self, Self::Rejection> {
        let identity = HttpIdentity::from_request_parts(parts, state).await?;

        let auth_service: &Arc<AuthService> = state.data.as_ref().as_ref();
        if let Err(e) = check_admin_role(&identity, auth_service.admin_roles()) {
            warn!(
                user_id = %identity.id,
                roles = ?identity.roles(),
                path = %parts.uri.path(),
                "Non-admin user attempted admin access"
            );
            return Err(e);
        }

        Ok(Self(identity))
    }
}
