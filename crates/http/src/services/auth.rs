//! Authentication service for coordinating auth operations

use crate::error::HttpError;
use crate::services::identity::{HttpContext, HttpIdentity};
use crate::services::jwt::{JwtService, TokenSubject};
use std::sync::Arc;

/// Turns bearer tokens into identities and decides who is an administrator
pub struct AuthService {
    jwt_service: Arc<JwtService>,
    admin_roles: Vec<String>,
}

impl AuthService {
    pub fn new(jwt_service: Arc<JwtService>, admin_roles: Vec<String>) -> Self {
        Self {
            jwt_service,
            admin_roles,
        }
    }

    pub fn admin_roles(&self) -> &[String] {
        &self.admin_roles
    }

    pub fn is_admin(&self, identity: &HttpIdentity) -> bool {
        identity.context.has_any_role(&self.admin_roles)
    }

    /// Sign a token for `subject`
    pub fn issue_token(&self, subject: &TokenSubject<'_>) -> Result<String, HttpError> {
        self.jwt_service.generate_token(subject)
    }

    /// Validate a JWT token and return the caller's identity
    pub fn validate_token(&self, token: &str) -> Result<HttpIdentity, HttpError> {
        let claims = self.jwt_service.validate_token(token)?;

        let mut context = HttpContext::new().with_roles(claims.roles);
        if let Some(company_id) = claims.company_id {
            context = context.with_company(company_id);
        }
        if let Some(name) = claims.name {
            context = context.with_attribute("name", name);
        }

        Ok(HttpIdentity::new(claims.sub, "jwt".to_string(), context))
    }

    /// Extract and validate token from Authorization header
    pub fn authenticate_from_header(&self, auth_header: &str) -> Result<HttpIdentity, HttpError> {
        let token = self.jwt_service.extract_bearer_token(auth_header)?;
        self.validate_token(token)
    }
}
