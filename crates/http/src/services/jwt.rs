//! JWT service for token management

use crate::error::HttpError;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use permit_core::CompanyId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's display name
    pub name: Option<String>,
    /// Company the user acts for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

/// Who a token is issued for
#[derive(Debug, Clone, Default)]
pub struct TokenSubject<'a> {
    pub user_id: &'a str,
    pub name: Option<&'a str>,
    pub company_id: Option<CompanyId>,
    pub roles: &'a [String],
}

/// JWT service configuration
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token expiration duration
    pub expiration: Duration,
    /// Token issuer
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(secret: String, expiration_hours: i64, issuer: String) -> Self {
        Self {
            secret,
            expiration: Duration::hours(expiration_hours),
            issuer,
        }
    }
}

/// Signs and checks HS256 tokens for one issuer
pub struct JwtService {
    config: Arc<JwtConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Tokens from another issuer are rejected even when the secret matches
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&config.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            config: Arc::new(config),
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Sign a token for `subject`, valid for the configured lifetime
    pub fn generate_token(&self, subject: &TokenSubject<'_>) -> Result<String, HttpError> {
        let issued_at = Utc::now();

        let claims = Claims {
            sub: subject.user_id.to_string(),
            name: subject.name.map(str::to_string),
            company_id: subject.company_id,
            roles: subject.roles.to_vec(),
            exp: (issued_at + self.config.expiration).timestamp(),
            iat: issued_at.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| HttpError::InternalServerError(format!("Failed to sign token: {e}")))
    }

    /// Decode `token`, checking signature, expiry and issuer
    pub fn validate_token(&self, token: &str) -> Result<Claims, HttpError> {
        use jsonwebtoken::errors::ErrorKind;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token has expired".to_string(),
                ErrorKind::InvalidIssuer => "Token was issued elsewhere".to_string(),
                ErrorKind::InvalidSignature | ErrorKind::InvalidToken => {
                    "Invalid token".to_string()
                }
                _ => format!("Token validation failed: {e}"),
            };
            HttpError::AuthenticationFailed(reason)
        })?;

        Ok(data.claims)
    }

    /// Extract token from Authorization header
    pub fn extract_bearer_token<'a>(&self, auth_header: &'a str) -> Result<&'a str, HttpError> {
        auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            HttpError::AuthenticationFailed("Invalid authorization header format".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::new(
            "test-secret".to_string(),
            24,
            "test-issuer".to_string(),
        ))
    }

    #[test]
    fn test_token_round_trip_keeps_company_and_roles() {
        let service = service();
        let roles = vec!["company_owner".to_string()];

        let token = service
            .generate_token(&TokenSubject {
                user_id: "test-user-123",
                name: Some("Test User"),
                company_id: Some(42),
                roles: &roles,
            })
            .unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "test-user-123");
        assert_eq!(claims.name.as_deref(), Some("Test User"));
        assert_eq!(claims.company_id, Some(42));
        assert_eq!(claims.roles, roles);
    }

    #[test]
    fn test_expired_token() {
        let service = service();
        let expired_time = Utc::now() - Duration::seconds(3600);

        let claims = Claims {
            sub: "user".to_string(),
            name: None,
            company_id: None,
            roles: vec![],
            exp: expired_time.timestamp(),
            iat: expired_time.timestamp(),
            iss: service.config.issuer.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &service.encoding_key).unwrap();

        match service.validate_token(&token) {
            Err(HttpError::AuthenticationFailed(msg)) => {
                assert!(msg.to_lowercase().contains("expired"));
            }
            other => panic!("Expected authentication failed error, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let issued = service()
            .generate_token(&TokenSubject {
                user_id: "user",
                ..Default::default()
            })
            .unwrap();

        let other = JwtService::new(JwtConfig::new(
            "test-secret".to_string(),
            24,
            "someone-else".to_string(),
        ));
        assert!(other.validate_token(&issued).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        let service = service();

        assert_eq!(
            service.extract_bearer_token("Bearer abc123").unwrap(),
            "abc123"
        );
        assert!(service.extract_bearer_token("Basic abc123").is_err());
        assert!(service.extract_bearer_token("abc123").is_err());
    }
}
