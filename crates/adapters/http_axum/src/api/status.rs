//! Aggregated status endpoint.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use plughub_app::ports::{ConfigStore, RemoteStateClient};
use plughub_domain::device::Device;
use plughub_domain::rule::Rule;
use plughub_domain::state::StateSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `GET /api/status`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub state: StateSnapshot,
    pub update_ok: bool,
    pub update_status: String,
    /// Unix time of the last successful refresh.
    pub update_time: i64,
    pub rules: Vec<Rule>,
    pub devices: Vec<Device>,
}

/// Possible responses from the status endpoint.
pub enum StatusResponse {
    Ok(Json<StatusBody>),
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/status`
pub async fn get<C, R>(State(state): State<AppState<C, R>>) -> Result<StatusResponse, ApiError>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    let status = state.gateway.status().await?;
    Ok(StatusResponse::Ok(Json(StatusBody {
        state: status.state,
        update_ok: status.refresh.ok,
        update_status: status.refresh.message,
        update_time: status.refresh.last_success_unix_time,
        rules: status.rules,
        devices: status.devices,
    })))
}
