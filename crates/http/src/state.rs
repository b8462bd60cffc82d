//! Application state management

use permit_core::StateBackend;
use permit_core::access::Entitlements;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
///
/// Holds the storage backend and the entitlement engine built over it.
/// Deployment specific data (settings, auth service) rides in `data`.
#[derive(Clone)]
pub struct AppState<T = ()> {
    /// State backend for data persistence
    pub state_backend: Arc<dyn StateBackend>,
    /// Permission catalog, grants, resolver and gate
    pub entitlements: Entitlements,
    /// Custom state data
    pub data: Arc<T>,
}

impl<T> AppState<T> {
    /// Create a new AppState, wiring a fresh engine over `state_backend`
    pub fn new(state_backend: Arc<dyn StateBackend>, cache_ttl: Duration, data: T) -> Self {
        let entitlements = Entitlements::new(state_backend.clone(), cache_ttl);
        Self {
            state_backend,
            entitlements,
            data: Arc::new(data),
        }
    }
}

#[cfg(test)]
impl Default for AppState<()> {
    fn default() -> Self {
        use permit_core::tests::memory::InMemoryBackend;

        Self::new(
            Arc::new(InMemoryBackend::default()),
            Duration::from_secs(60),
            (),
        )
    }
}
