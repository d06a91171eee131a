//! JSON handlers for scheduled rules.
//!
//! Trigger times may carry any offset; they are normalized to UTC on decode.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use plughub_app::ports::{ConfigStore, RemoteStateClient};
use plughub_domain::rule::Rule;

use crate::error::ApiError;
use crate::state::AppState;

/// Rule list as exchanged on `/api/rules`.
#[derive(Serialize, Deserialize)]
pub struct RulesBody {
    pub rules: Vec<Rule>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<RulesBody>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the set endpoint.
pub enum SetResponse {
    Stored,
}

impl IntoResponse for SetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Stored => "OK".into_response(),
        }
    }
}

/// `GET /api/rules`
pub async fn list<C, R>(State(state): State<AppState<C, R>>) -> ListResponse
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    let rules = state.gateway.rules().await;
    ListResponse::Ok(Json(RulesBody { rules }))
}

/// `POST /api/rules`
pub async fn set<C, R>(
    State(state): State<AppState<C, R>>,
    Json(req): Json<RulesBody>,
) -> Result<SetResponse, ApiError>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    state.gateway.set_rules(req.rules).await?;
    Ok(SetResponse::Stored)
}
