//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod rules;
#[allow(clippy::missing_errors_doc)]
pub mod snapshot;
#[allow(clippy::missing_errors_doc)]
pub mod status;

use axum::Router;
use axum::routing::get;

use plughub_app::ports::{ConfigStore, RemoteStateClient};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<C, R>() -> Router<AppState<C, R>>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    Router::new()
        .route("/status", get(status::get::<C, R>))
        .route(
            "/state",
            get(snapshot::get::<C, R>).post(snapshot::set::<C, R>),
        )
        .route("/rules", get(rules::list::<C, R>).post(rules::set::<C, R>))
        .route("/devices", get(devices::list::<C, R>))
}
