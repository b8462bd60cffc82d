//! Service layer for authentication

pub mod auth;
pub mod identity;
pub mod jwt;

pub use auth::AuthService;
pub use identity::{HttpContext, HttpIdentity};
pub use jwt::{Claims, JwtConfig, JwtService, TokenSubject};
