//! JSON handlers for devices.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use plughub_app::ports::{ConfigStore, RemoteStateClient};
use plughub_domain::device::Device;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list<C, R>(State(state): State<AppState<C, R>>) -> Result<ListResponse, ApiError>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    let devices = state.gateway.devices().await?;
    Ok(ListResponse::Ok(Json(devices)))
}
