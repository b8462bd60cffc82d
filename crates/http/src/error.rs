//! HTTP error types and implementations

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use permit_core::access::AccessError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP-specific errors
#[derive(Error, Debug)]
pub enum HttpError {
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Authorization failed
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Feature gate refusal; the message is shown to end users as is
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// Conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unprocessable entity
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::AuthorizationFailed(_) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::AuthorizationFailed(_) => "authorization_failed",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::InternalServerError(_) => "internal_server_error",
            Self::Conflict(_) => "conflict",
            Self::UnprocessableEntity(_) => "unprocessable_entity",
        }
    }
}

impl From<AccessError> for HttpError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::DuplicateName(_) => Self::Conflict(err.to_string()),
            AccessError::InvalidPrice(_)
            | AccessError::InvalidName(_)
            | AccessError::ImmutableName { .. } => Self::UnprocessableEntity(err.to_string()),
            AccessError::NotFound(_)
            | AccessError::UnknownPermission(_)
            | AccessError::CompanyNotFound(_) => Self::NotFound(err.to_string()),
            AccessError::Forbidden(reason) => Self::Forbidden(reason.to_string()),
            AccessError::Storage(permit_core::Error::Conflict(msg)) => Self::Conflict(msg),
            AccessError::Storage(permit_core::Error::InvalidValue(msg)) => {
                Self::UnprocessableEntity(msg)
            }
            AccessError::ProvisioningFailed { .. } | AccessError::Storage(_) => {
                error!(error = %err, "Request failed");
                Self::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<permit_core::Error> for HttpError {
    fn from(err: permit_core::Error) -> Self {
        AccessError::from(err).into()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            details: None,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias using HttpError
pub type Result<T> = std::result::Result<T, HttpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use permit_core::access::ForbiddenReason;

    #[test]
    fn test_access_errors_map_to_status_codes() {
        let cases = [
            (AccessError::DuplicateName("a".into()), StatusCode::CONFLICT),
            (
                AccessError::InvalidName("empty".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AccessError::ImmutableName {
                    current: "a".into(),
                    requested: "b".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AccessError::UnknownPermission("x".into()), StatusCode::NOT_FOUND),
            (AccessError::CompanyNotFound(3), StatusCode::NOT_FOUND),
            (
                AccessError::ProvisioningFailed {
                    company: "Acme".into(),
                    reason: "disk".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AccessError::Storage(permit_core::Error::Conflict("email".into())),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(HttpError::from(err).status(), status);
        }
    }

    #[test]
    fn test_forbidden_message_is_verbatim() {
        let err = HttpError::from(AccessError::Forbidden(ForbiddenReason::PermissionDenied {
            permission: "view-analytics".into(),
            company_name: "Acme".into(),
        }));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            err.to_string(),
            "Feature 'view-analytics' is not available for Acme."
        );
    }
}
