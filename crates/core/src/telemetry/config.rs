use serde::{Deserialize, Serialize};

/// Filter used when neither `RUST_LOG` nor a configured level is present
pub const DEFAULT_LOG_FILTER: &str = "permit=info,tower_http=info";

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Service name recorded on startup
    pub service_name: String,
    pub service_version: String,
    /// `EnvFilter` directives, e.g. `permit=debug,sqlx=warn`
    pub log_level: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "permit".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// - `SERVICE_NAME`: service name
    /// - `RUST_LOG`: filter directives
    /// - `PERMIT_LOG_JSON`: `1` or `true` for JSON output
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name);
        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let json = std::env::var("PERMIT_LOG_JSON")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            service_name,
            service_version: defaults.service_version,
            log_level,
            json,
        }
    }

    /// Verbose human-readable output for local work
    pub fn dev() -> Self {
        Self {
            service_name: "permit-dev".to_string(),
            service_version: "dev".to_string(),
            log_level: "permit=debug,tower_http=debug,sqlx=warn".to_string(),
            json: false,
        }
    }
}
