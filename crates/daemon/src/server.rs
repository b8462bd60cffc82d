//! Server setup and configuration module

use crate::bootstrap::{self, SeedReport};
use crate::config::Settings;
use crate::error::{DaemonError, Result};
use crate::state::ServerState;
use axum::http::{HeaderValue, header};
use permit_core::StateBackend;
use permit_http::{
    AppState,
    routes::{self, features},
    services::{AuthService, JwtConfig, JwtService},
};
use permit_sqlx::SqliteStateBackend;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as _};

const DEVELOPMENT_JWT_SECRET: &str = "permit-development-secret-change-me";

/// Filesystem path behind a SQLite URL, if it names a file
fn database_file(url: &str) -> Option<PathBuf> {
    if url.contains(":memory:") || url.contains("mode=memory") {
        return None;
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Longest accepted token lifetime
const MAX_TOKEN_HOURS: u64 = 24 * 365;

/// JWT service for `settings`, falling back to a development secret
pub fn jwt_service(settings: &Settings) -> Arc<JwtService> {
    let secret = settings.jwt_secret().unwrap_or_else(|| {
        warn!("No JWT secret configured, using the development secret");
        DEVELOPMENT_JWT_SECRET.to_string()
    });

    let jwt = &settings.auth.jwt;
    let hours = i64::try_from(jwt.expiration_hours.clamp(1, MAX_TOKEN_HOURS)).unwrap_or(24);
    Arc::new(JwtService::new(JwtConfig::new(
        secret,
        hours,
        jwt.issuer.clone(),
    )))
}

/// Server configuration builder
pub struct ServerBuilder {
    settings: Arc<Settings>,
    state_backend: Arc<dyn StateBackend>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new(settings: Settings, state_backend: Arc<dyn StateBackend>) -> Self {
        Self {
            settings: Arc::new(settings),
            state_backend,
        }
    }

    /// Open the configured SQLite database, creating its directory if needed
    pub async fn connect(settings: Settings) -> Result<Self> {
        let url = settings.database.url.clone();
        if let Some(parent) = database_file(&url)
            .as_deref()
            .and_then(std::path::Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        info!(database = %url, "Opening state backend");
        let backend = SqliteStateBackend::new(&url).await?;
        Ok(Self::new(settings, Arc::new(backend)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build the JWT service
    pub fn build_jwt_service(&self) -> Arc<JwtService> {
        jwt_service(&self.settings)
    }

    /// Build the app state
    pub fn build_app_state(&self, jwt_service: Arc<JwtService>) -> AppState<ServerState> {
        let auth_service = Arc::new(AuthService::new(
            jwt_service,
            self.settings.auth.admin_roles.clone(),
        ));

        let server_state = ServerState {
            auth_service,
            settings: self.settings.clone(),
        };

        AppState::new(
            self.state_backend.clone(),
            Duration::from_secs(self.settings.entitlements.cache_ttl_secs),
            server_state,
        )
    }

    /// Seed the catalog and optionally heal General grants
    pub async fn bootstrap(&self, state: &AppState<ServerState>) -> Result<SeedReport> {
        let backend = self.state_backend.as_ref();
        let mut report =
            bootstrap::seed_catalog(backend, &state.entitlements, &self.settings.seed).await?;

        if self.settings.entitlements.reconcile_on_startup {
            report.companies_reconciled =
                bootstrap::reconcile_general_grants(backend, &state.entitlements).await?;
        }

        Ok(report)
    }

    /// Build the router (specifically for ServerState)
    pub fn build_router() -> OpenApiRouter<AppState<ServerState>> {
        routes::api_router::<ServerState>()
    }

    /// Build the complete axum router with documentation
    pub fn build_axum_router<T>(
        router: OpenApiRouter<AppState<T>>,
        state: AppState<T>,
        settings: &Settings,
    ) -> axum::Router
    where
        T: Clone + Send + Sync + 'static + AsRef<Arc<AuthService>>,
    {
        let (router, api) = router.split_for_parts();

        // Feature routes are built from configuration and stay out of the docs
        let router = router
            .merge(features::router(&state, &settings.features.routes))
            .merge(Scalar::with_url("/docs", api));

        router
            .with_state(state.clone())
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                permit_http::middleware::auth::auth_middleware::<T>,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(
                settings.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(Self::cors_layer(&settings.server.cors_origins))
    }

    fn cors_layer(origins: &[String]) -> CorsLayer {
        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    }

    /// Wire everything and return the router ready to serve
    pub async fn build(self) -> Result<(axum::Router, AppState<ServerState>)> {
        let jwt_service = self.build_jwt_service();
        let state = self.build_app_state(jwt_service);

        let report = self.bootstrap(&state).await?;
        debug!(?report, "Bootstrap finished");

        let router = Self::build_axum_router(Self::build_router(), state.clone(), &self.settings);
        Ok((router, state))
    }
}

/// Serve `app` on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    app: axum::Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DaemonError::Http(e.to_string()))
}
