//! reqwest-backed implementation of [`RemoteStateClient`].

use std::future::Future;

use serde::{Deserialize, Serialize};

use plughub_app::ports::RemoteStateClient;
use plughub_domain::error::RemoteError;

use crate::error::HttpRemoteError;

/// Connection settings for the device controller.
#[derive(Debug, Clone)]
pub struct RemoteHttpConfig {
    /// Base URL, e.g. `https://controller.local:8443`.
    pub url: String,
    /// API key sent with every request.
    pub key: String,
    /// Accept self-signed controller certificates.
    pub accept_invalid_certs: bool,
}

#[derive(Serialize)]
struct GetStateRequest<'a> {
    key: &'a str,
}

#[derive(Deserialize)]
struct GetStateResponse {
    state: String,
}

#[derive(Serialize)]
struct SetStateRequest<'a> {
    key: &'a str,
    state: &'a str,
}

#[derive(Deserialize)]
struct SetStateResponse {
    #[serde(default)]
    success: bool,
}

/// HTTP client for the device controller, built once at startup.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    client: reqwest::Client,
    get_url: String,
    set_url: String,
    key: String,
}

impl HttpRemoteClient {
    /// Build the client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpRemoteError::Client`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: RemoteHttpConfig) -> Result<Self, HttpRemoteError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(HttpRemoteError::Client)?;
        let base = config.url.trim_end_matches('/');

        Ok(Self {
            client,
            get_url: format!("{base}/get_state"),
            set_url: format!("{base}/set_state"),
            key: config.key,
        })
    }

    async fn call<B, T>(&self, url: &str, body: &B) -> Result<T, HttpRemoteError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let transport = |source| HttpRemoteError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpRemoteError::Status {
                url: url.to_string(),
                status,
            });
        }

        let text = response.text().await.map_err(transport)?;
        serde_json::from_str(&text).map_err(|source| HttpRemoteError::Envelope {
            url: url.to_string(),
            source,
        })
    }
}

impl RemoteStateClient for HttpRemoteClient {
    fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
        async move {
            let request = GetStateRequest { key: &self.key };
            let response: GetStateResponse = self.call(&self.get_url, &request).await?;
            Ok(response.state)
        }
    }

    fn set_state(
        &self,
        state_json: String,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send {
        async move {
            let request = SetStateRequest {
                key: &self.key,
                state: &state_json,
            };
            let response: SetStateResponse = self.call(&self.set_url, &request).await?;
            if !response.success {
                tracing::debug!(url = %self.set_url, "controller did not confirm write");
            }
            Ok(response.success)
        }
    }
}
