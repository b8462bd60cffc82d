//! Health check handler

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Health check response
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Storage is unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check<T>(
    State(app_state): State<AppState<T>>,
) -> (StatusCode, Json<HealthResponse>)
where
    T: Clone + Send + Sync + 'static,
{
    let (status, database) = match app_state.state_backend.count_permissions().await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(e) => {
            warn!(error = %e, "Health check could not reach storage");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let body = HealthResponse {
        status: if status.is_success() {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        timestamp: chrono::Utc::now(),
    };

    (status, Json(body))
}

pub fn router<T>() -> OpenApiRouter<AppState<T>>
where
    T: Clone + Send + Sync + 'static,
{
    OpenApiRouter::new().routes(routes!(health_check))
}
