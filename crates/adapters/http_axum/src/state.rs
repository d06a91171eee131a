//! Shared application state for axum handlers.

use std::sync::Arc;

use plughub_app::ports::{ConfigStore, RemoteStateClient};
use plughub_app::services::GatewayService;

use crate::auth::ApiKeyGate;

/// Application state shared across all axum handlers.
///
/// Generic over the config store and the remote client to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<C, R> {
    /// Gateway use-cases.
    pub gateway: Arc<GatewayService<C, R>>,
    /// API key check for `/api`, if one is configured.
    pub auth: Option<ApiKeyGate>,
}

impl<C, R> Clone for AppState<C, R> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            auth: self.auth.clone(),
        }
    }
}

impl<C, R> AppState<C, R>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    /// Create a new application state around a shared service.
    pub fn new(gateway: Arc<GatewayService<C, R>>) -> Self {
        Self {
            gateway,
            auth: None,
        }
    }

    /// Require `api_key` on every `/api` route.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth = Some(ApiKeyGate::new(api_key));
        self
    }
}
