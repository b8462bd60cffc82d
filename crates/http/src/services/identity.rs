use crate::error::HttpError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use permit_core::CompanyId;
use permit_core::access::{COMPANY_ID_ATTRIBUTE, IdentityContext, SubjectIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;

/// Request context carried by an authenticated caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpContext {
    pub attributes: HashMap<String, String>,
    pub roles: Vec<String>,
}

impl HttpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_company(self, company_id: CompanyId) -> Self {
        self.with_attribute(COMPANY_ID_ATTRIBUTE, company_id.to_string())
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }
}

impl IdentityContext for HttpContext {
    fn to_attributes(&self) -> HashMap<String, String> {
        let mut attributes = self.attributes.clone();
        if !self.roles.is_empty() {
            attributes.insert("roles".to_string(), self.roles.join(","));
        }
        attributes
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }
}

/// HTTP identity wrapper that can implement FromRequestParts
#[derive(Debug, Clone)]
pub struct HttpIdentity(pub SubjectIdentity<HttpContext>);

impl HttpIdentity {
    pub fn new(id: String, source: String, context: HttpContext) -> Self {
        Self(SubjectIdentity {
            id,
            source,
            context,
        })
    }

    pub fn roles(&self) -> &[String] {
        &self.context.roles
    }
}

impl Deref for HttpIdentity {
    type Target = SubjectIdentity<HttpContext>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for HttpIdentity
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<HttpIdentity>()
            .cloned()
            .ok_or_else(|| HttpError::AuthenticationFailed("User not authenticated".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_and_roles_in_context() {
        let context = HttpContext::new().with_company(12).with_roles(["admin"]);
        let identity = HttpIdentity::new("user-1".into(), "jwt".into(), context);

        assert_eq!(identity.company_id(), Some(12));
        assert!(identity.context.has_any_role(&["admin".to_string()]));
        assert_eq!(
            identity.context.to_attributes().get("roles").map(String::as_str),
            Some("admin")
        );
    }
}
