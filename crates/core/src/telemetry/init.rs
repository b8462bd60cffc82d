use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use super::config::{DEFAULT_LOG_FILTER, InstrumentationConfig};

/// Install the global subscriber. `RUST_LOG` takes precedence over the config.
pub fn init_tracing(config: &InstrumentationConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()?;
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Tracing initialized"
    );
    Ok(())
}

/// Initialize with default configuration from environment
pub fn init_default() -> Result<()> {
    init_tracing(&InstrumentationConfig::from_env())
}
