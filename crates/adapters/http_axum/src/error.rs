//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use plughub_domain::error::PlugHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

/// Maps [`PlugHubError`] to an HTTP response with appropriate status code.
pub struct ApiError(PlugHubError);

impl From<PlugHubError> for ApiError {
    fn from(err: PlugHubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            PlugHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            PlugHubError::Remote(err) => {
                tracing::warn!(error = %err, "remote error");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            PlugHubError::Persistence(err) => {
                tracing::error!(error = %err, "persistence error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
