//! Runtime choice between the simulated and the real device controller.

use std::future::Future;

use plughub_adapter_remote_http::{HttpRemoteClient, HttpRemoteError};
use plughub_adapter_virtual::VirtualController;
use plughub_app::ports::RemoteStateClient;
use plughub_domain::error::RemoteError;

use crate::config::Config;

/// The controller selected by `[remote] mode`.
pub enum Remote {
    Virtual(VirtualController),
    Http(HttpRemoteClient),
}

impl Remote {
    /// Build the controller client described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpRemoteError`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, HttpRemoteError> {
        match config.remote_http_config() {
            Some(http) => {
                tracing::info!(url = %http.url, "using HTTP device controller");
                Ok(Self::Http(HttpRemoteClient::new(http)?))
            }
            None => {
                tracing::info!("using virtual device controller");
                Ok(Self::Virtual(VirtualController::default()))
            }
        }
    }
}

impl RemoteStateClient for Remote {
    fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
        async move {
            match self {
                Self::Virtual(remote) => remote.get_state().await,
                Self::Http(remote) => remote.get_state().await,
            }
        }
    }

    fn set_state(
        &self,
        state_json: String,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send {
        async move {
            match self {
                Self::Virtual(remote) => remote.set_state(state_json).await,
                Self::Http(remote) => remote.set_state(state_json).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteMode;

    #[test]
    fn should_pick_virtual_controller_by_default() {
        let remote = Remote::from_config(&Config::default()).unwrap();
        assert!(matches!(remote, Remote::Virtual(_)));
    }

    #[test]
    fn should_pick_http_controller_when_configured() {
        let mut config = Config::default();
        config.remote.mode = RemoteMode::Http;
        config.remote.url = Some("https://controller.local".to_string());

        let remote = Remote::from_config(&config).unwrap();

        assert!(matches!(remote, Remote::Http(_)));
    }

    #[tokio::test]
    async fn should_delegate_to_virtual_controller() {
        let remote = Remote::from_config(&Config::default()).unwrap();

        assert!(remote.set_state(r#"{"garden-pump":1}"#.to_string()).await.unwrap());
        assert!(remote.get_state().await.unwrap().contains(r#""garden-pump":1"#));
    }
}
