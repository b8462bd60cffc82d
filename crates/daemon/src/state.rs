use crate::config::Settings;
use permit_http::services::AuthService;
use std::sync::Arc;

/// Deployment data carried in `AppState::data`
#[derive(Clone)]
pub struct ServerState {
    pub auth_service: Arc<AuthService>,
    pub settings: Arc<Settings>,
}

impl AsRef<Arc<AuthService>> for ServerState {
    fn as_ref(&self) -> &Arc<AuthService> {
        &self.auth_service
    }
}
