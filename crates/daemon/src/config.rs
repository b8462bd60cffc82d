//! Configuration for the permit daemon
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file,
//! then `PERMIT_*` environment variables with `__` between sections
//! (`PERMIT_SERVER__PORT=9000`).

use config::{Config, ConfigError, Environment, File};
use permit_core::PermissionType;
use permit_core::telemetry::InstrumentationConfig;
use permit_http::routes::features::FeatureRoute;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "PERMIT";

/// Daemon settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub entitlements: EntitlementsConfig,
    /// Routes gated by a single permission each
    pub features: FeaturesConfig,
    /// Catalog entries created at startup when missing
    pub seed: SeedConfig,
    pub logging: InstrumentationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed origins; empty allows any
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// SQLite file in the platform data directory, or the working directory when
/// no home directory can be determined
fn default_database_url() -> String {
    match directories::ProjectDirs::from("", "", "permit") {
        Some(dirs) => format!("sqlite://{}", dirs.data_dir().join("permit.db").display()),
        None => "sqlite://permit.db".to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    /// Roles that may use the admin API
    pub admin_roles: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            admin_roles: vec!["admin".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Falls back to `JWT_SECRET`, then to a development secret
    pub secret: Option<String>,
    pub expiration_hours: u64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            expiration_hours: 24,
            issuer: "permit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementsConfig {
    /// Lifetime of cached `can_use` answers, capped at one hour
    pub cache_ttl_secs: u64,
    /// Grant General permissions to companies missing them at startup
    pub reconcile_on_startup: bool,
}

impl Default for EntitlementsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            reconcile_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub routes: Vec<FeatureRoute>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            routes: ["manage-company", "dashboard-access", "view-analytics"]
                .map(FeatureRoute::for_permission)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Category names; slugs are derived
    pub categories: Vec<String>,
    pub permissions: Vec<SeedPermission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPermission {
    pub name: String,
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    #[serde(default)]
    pub price: Decimal,
}

impl SeedPermission {
    fn new(name: &str, permission_type: PermissionType, price: Decimal) -> Self {
        Self {
            name: name.to_string(),
            permission_type,
            price,
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            categories: ["Healthcare", "Retail", "Education", "Hospitality", "Technology"]
                .map(String::from)
                .to_vec(),
            permissions: vec![
                SeedPermission::new("manage-company", PermissionType::General, Decimal::ZERO),
                SeedPermission::new("dashboard-access", PermissionType::General, Decimal::ZERO),
                SeedPermission::new(
                    "view-analytics",
                    PermissionType::Unique,
                    Decimal::new(500_000, 0),
                ),
            ],
        }
    }
}

impl Settings {
    /// Defaults overridden by the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(None)
    }

    /// Defaults, then `path`, then the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Missing keys fall back to the serde defaults above
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .with_list_parse_key("auth.admin_roles")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// JWT secret from the settings, then `JWT_SECRET`
    pub fn jwt_secret(&self) -> Option<String> {
        self.auth
            .jwt
            .secret
            .clone()
            .or_else(|| std::env::var("JWT_SECRET").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_cover_the_standard_catalog() {
        let settings = Settings::default();
        assert_eq!(settings.server.address(), "127.0.0.1:8080");
        assert_eq!(settings.auth.admin_roles, vec!["admin"]);
        assert!(settings.database.url.starts_with("sqlite://"));

        let paths: Vec<_> = settings.features.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/api/features/manage-company",
                "/api/features/dashboard-access",
                "/api/features/view-analytics"
            ]
        );

        let general = settings
            .seed
            .permissions
            .iter()
            .filter(|p| p.permission_type == PermissionType::General)
            .count();
        assert_eq!(general, 2);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("permit-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9191

[database]
url = "sqlite::memory:"

[entitlements]
cache_ttl_secs = 30

[[features.routes]]
path = "/api/reports"
permission = "export-reports"

[[seed.permissions]]
name = "export-reports"
type = "unique"
price = "99.90"
"#
        )
        .unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.database.url, "sqlite::memory:");
        assert_eq!(settings.entitlements.cache_ttl_secs, 30);
        assert_eq!(
            settings.features.routes,
            vec![FeatureRoute::new("/api/reports", "export-reports")]
        );
        assert_eq!(settings.seed.permissions.len(), 1);
        assert_eq!(settings.seed.permissions[0].price, Decimal::new(9_990, 2));
    }
}
