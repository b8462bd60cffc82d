//! Company registration

use crate::error::HttpError;
use crate::routes::types::{CompanyInfo, PermissionInfo};
use crate::services::{AuthService, TokenSubject};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use permit_core::NewCompany;
use permit_core::access::AccessError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Role carried by the token handed out at registration
pub const OWNER_ROLE: &str = "company_owner";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub company_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<i64>,
    pub owner_name: String,
    /// Generated when absent
    pub owner_user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub company: CompanyInfo,
    /// Bearer token for the owner, scoped to the new company
    pub token: String,
    /// Permissions the company starts with
    pub permissions: Vec<PermissionInfo>,
}

impl RegisterRequest {
    fn validate(self) -> Result<NewCompany, HttpError> {
        let name = self.company_name.trim();
        if name.is_empty() {
            return Err(HttpError::UnprocessableEntity(
                "company_name must not be empty".to_string(),
            ));
        }
        if permit_core::slugify(name).is_empty() {
            return Err(HttpError::UnprocessableEntity(
                "company_name must contain letters or digits".to_string(),
            ));
        }

        let email = self.email.trim();
        if !email.contains('@') {
            return Err(HttpError::UnprocessableEntity(format!(
                "'{email}' is not an email address"
            )));
        }

        let owner_name = self.owner_name.trim();
        if owner_name.is_empty() {
            return Err(HttpError::UnprocessableEntity(
                "owner_name must not be empty".to_string(),
            ));
        }

        Ok(NewCompany {
            name: name.to_string(),
            email: email.to_lowercase(),
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            address: self.address.filter(|a| !a.trim().is_empty()),
            category_id: self.category_id,
            owner_user_id: self
                .owner_user_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            owner_name: owner_name.to_string(),
        })
    }
}

/// Register a company and provision its General permissions
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Company registered", body = RegisterResponse),
        (status = 409, description = "Company name or email already registered"),
        (status = 422, description = "Invalid registration data or unknown category"),
        (status = 500, description = "Provisioning failed, nothing was created"),
    ),
    tag = "companies"
)]
#[instrument(name = "register_company", skip(app_state, request), fields(company = %request.company_name))]
pub async fn register_company<T>(
    State(app_state): State<AppState<T>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), HttpError>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    let new_company = request.validate()?;
    super::check_category(&app_state, new_company.category_id).await?;

    let company = app_state
        .entitlements
        .provisioning()
        .provision_company(&new_company)
        .await
        .map_err(|e| match e {
            AccessError::Storage(permit_core::Error::Conflict(_)) => HttpError::Conflict(format!(
                "A company named '{}' or using '{}' is already registered",
                new_company.name, new_company.email
            )),
            other => other.into(),
        })?;

    let permissions = app_state.entitlements.grants().list_grants(company.id).await?;

    let auth_service: &Arc<AuthService> = app_state.data.as_ref().as_ref();
    let roles = vec![OWNER_ROLE.to_string()];
    let token = auth_service.issue_token(&TokenSubject {
        user_id: &company.owner_user_id,
        name: Some(&company.owner_name),
        company_id: Some(company.id),
        roles: &roles,
    })?;

    info!(
        company_id = company.id,
        slug = %company.slug,
        permissions = permissions.len(),
        "Company registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            company: company.into(),
            token,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }),
    ))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
{
    OpenApiRouter::new().routes(routes!(register_company))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            company_name: name.to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            address: None,
            category_id: None,
            owner_name: "Dana".to_string(),
            owner_user_id: None,
        }
    }

    #[test]
    fn test_validate_normalizes_input() {
        let company = request("  Acme Labs ", "Owner@Acme.test").validate().unwrap();
        assert_eq!(company.name, "Acme Labs");
        assert_eq!(company.email, "owner@acme.test");
        assert_eq!(company.phone, None);
        assert!(!company.owner_user_id.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        for (name, email) in [("", "a@b.test"), ("!!!", "a@b.test"), ("Acme", "nope")] {
            let err = request(name, email).validate().unwrap_err();
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
}
