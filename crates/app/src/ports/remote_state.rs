//! Remote state port — the service that actually talks to the devices.

use std::future::Future;

use plughub_domain::error::RemoteError;

/// Request/response access to the remote device controller.
///
/// Snapshots cross this boundary as JSON objects mapping device id to value
/// (`{"<id>": 0|1, …}`); decoding and encoding is the caller's job so that
/// malformed payloads surface as [`RemoteError::Decode`] in the core.
/// Implementations hold their own credentials and connection, established once
/// at startup. Deadlines are applied by the caller.
pub trait RemoteStateClient {
    /// Fetch the current snapshot as a JSON document.
    fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// Ask the remote to apply `state_json`.
    ///
    /// Returns `Ok(false)` when the remote answered but did not report success.
    fn set_state(
        &self,
        state_json: String,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send;
}

impl<T: RemoteStateClient + Send + Sync> RemoteStateClient for std::sync::Arc<T> {
    fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
        (**self).get_state()
    }

    fn set_state(
        &self,
        state_json: String,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send {
        (**self).set_state(state_json)
    }
}
