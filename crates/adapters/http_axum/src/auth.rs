//! API key authentication middleware.
//!
//! The key is accepted from the `x-api-key` header or from
//! `Authorization: Bearer <key>`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorBody;

/// The single key allowed to call the API.
#[derive(Clone)]
pub struct ApiKeyGate {
    key: Arc<str>,
}

impl ApiKeyGate {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Arc::from(key.into()),
        }
    }

    fn accepts(&self, presented: &str) -> bool {
        *self.key == *presented
    }
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate").finish_non_exhaustive()
    }
}

/// Authentication failure returned as `401`.
pub struct Unauthorized(&'static str);

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
}

/// Reject the request unless it carries the configured key.
///
/// # Errors
///
/// Returns [`Unauthorized`] when the key is missing or wrong.
pub async fn require_api_key(
    State(gate): State<ApiKeyGate>,
    headers: HeaderMap,
    req: Request,
    next: Next,
) -> Result<Response, Unauthorized> {
    let key = presented_key(&headers).ok_or(Unauthorized(
        "missing API key, provide x-api-key or Authorization: Bearer <key>",
    ))?;

    if !gate.accepts(key) {
        tracing::debug!(path = %req.uri().path(), "invalid API key");
        return Err(Unauthorized("invalid API key"));
    }

    Ok(next.run(req).await)
}
