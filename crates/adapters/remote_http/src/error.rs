//! HTTP-specific error type for the remote client.

use plughub_domain::error::RemoteError;

/// Errors originating from the HTTP transport.
#[derive(Debug, thiserror::Error)]
pub enum HttpRemoteError {
    /// The HTTP client could not be built (TLS backend, bad configuration).
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The controller answered with a non-success status.
    #[error("controller answered {status} on {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The response envelope was not the expected JSON.
    #[error("malformed response from {url}")]
    Envelope {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<HttpRemoteError> for RemoteError {
    fn from(err: HttpRemoteError) -> Self {
        match err {
            HttpRemoteError::Status { status, .. }
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN =>
            {
                Self::Rejected(err.to_string())
            }
            HttpRemoteError::Envelope { source, .. } => Self::Decode(source),
            other => Self::Unreachable(Box::new(other)),
        }
    }
}
