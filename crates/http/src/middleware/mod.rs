//! Middleware components for HTTP request processing

pub mod auth;
pub mod entitlement;
pub mod rbac;

pub use auth::{AuthProvider, auth_middleware, is_public_path};
pub use entitlement::{FeatureGate, GrantedFeature, require_feature};
pub use rbac::{AdminIdentity, check_admin_role, check_roles};
