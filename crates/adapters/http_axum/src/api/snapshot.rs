//! JSON handlers for the live device state.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use plughub_app::ports::{ConfigStore, RemoteStateClient};
use plughub_domain::state::{RefreshStatus, StateSnapshot};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `GET /api/state`.
#[derive(Serialize)]
pub struct StateBody {
    pub state: StateSnapshot,
    pub status: RefreshStatus,
}

/// Body of `POST /api/state`.
#[derive(Deserialize)]
pub struct SetStateRequest {
    pub state: StateSnapshot,
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<StateBody>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the set endpoint.
pub enum SetResponse {
    Applied,
}

impl IntoResponse for SetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Applied => "OK".into_response(),
        }
    }
}

/// `GET /api/state`
pub async fn get<C, R>(State(state): State<AppState<C, R>>) -> GetResponse
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    let (snapshot, status) = state.gateway.snapshot().await;
    GetResponse::Ok(Json(StateBody {
        state: snapshot,
        status,
    }))
}

/// `POST /api/state`
pub async fn set<C, R>(
    State(state): State<AppState<C, R>>,
    Json(req): Json<SetStateRequest>,
) -> Result<SetResponse, ApiError>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    state.gateway.set_state(req.state).await?;
    Ok(SetResponse::Applied)
}
