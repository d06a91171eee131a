//! State cache — the gateway's best-known snapshot of remote device state.
//!
//! The cache pulls the full snapshot from the [`RemoteStateClient`] once per
//! refresh period and right after every successful write. A failed pull is
//! recorded in the [`RefreshStatus`] and leaves the last good snapshot in
//! place; readers never wait on network I/O.
//!
//! Locking: the snapshot lives behind a read/write lock that is only taken
//! around the in-memory swap, never across a remote call. Writes to the remote
//! go through a separate FIFO write gate so concurrent [`StateCache::set_state`]
//! calls (interactive or scheduled) reach the remote one at a time, in
//! submission order, each followed by its own reconciling refresh.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use plughub_domain::error::{PlugHubError, RemoteError};
use plughub_domain::state::{RefreshStatus, StateSnapshot};

use crate::ports::RemoteStateClient;
use crate::task::BackgroundTask;

/// Timing knobs for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Delay between two periodic refreshes.
    pub refresh_period: Duration,
    /// Deadline for a `get_state` call.
    pub get_timeout: Duration,
    /// Deadline for a `set_state` call (device commands are slower than reads).
    pub set_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_period: Duration::from_secs(1),
            get_timeout: Duration::from_secs(1),
            set_timeout: Duration::from_secs(5),
        }
    }
}

struct Cached {
    snapshot: StateSnapshot,
    status: RefreshStatus,
}

/// In-memory mirror of the remote device state.
pub struct StateCache<R> {
    remote: R,
    config: CacheConfig,
    cached: RwLock<Cached>,
    write_gate: Mutex<()>,
}

impl<R> StateCache<R>
where
    R: RemoteStateClient + Send + Sync + 'static,
{
    /// Create an empty cache. Nothing is fetched until the first refresh.
    pub fn new(remote: R, config: CacheConfig) -> Self {
        Self {
            remote,
            config,
            cached: RwLock::new(Cached {
                snapshot: StateSnapshot::new(),
                status: RefreshStatus::not_started(),
            }),
            write_gate: Mutex::new(()),
        }
    }

    /// Pull the snapshot from the remote and record the outcome.
    ///
    /// On failure the previous snapshot is kept and only the status changes.
    pub async fn refresh(&self) -> RefreshStatus {
        self.reload().await.0
    }

    /// Independent copy of the current snapshot plus the last refresh status.
    pub async fn snapshot(&self) -> (StateSnapshot, RefreshStatus) {
        let cached = self.cached.read().await;
        (cached.snapshot.clone(), cached.status.clone())
    }

    /// Outcome of the most recent refresh.
    pub async fn status(&self) -> RefreshStatus {
        self.cached.read().await.status.clone()
    }

    /// Apply `target` on the remote, then refresh the cache from it.
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::Remote`] when the write times out, cannot reach
    /// the remote, or is rejected ([`RemoteError::Rejected`]); in those cases
    /// the cache is left untouched. When the write succeeds, the error of the
    /// follow-up refresh is returned, if any.
    pub async fn set_state(&self, target: StateSnapshot) -> Result<(), PlugHubError> {
        let payload = serde_json::to_string(&target).map_err(RemoteError::Encode)?;

        let _gate = self.write_gate.lock().await;
        let timeout = self.config.set_timeout;
        let accepted = tokio::time::timeout(timeout, self.remote.set_state(payload))
            .await
            .map_err(|_| RemoteError::Timeout {
                operation: "set_state",
                timeout,
            })
            .and_then(|result| result)
            .inspect_err(|err| tracing::warn!(error = %describe(err), "set_state call failed"))?;

        if !accepted {
            tracing::warn!(devices = target.len(), "set_state rejected by remote");
            return Err(RemoteError::Rejected("remote did not report success".to_string()).into());
        }

        tracing::info!(devices = target.len(), "state applied on remote");
        let (_, refreshed) = self.reload().await;
        refreshed.map_err(PlugHubError::from)
    }

    /// Spawn the periodic refresh loop.
    pub fn spawn_refresher(self: &Arc<Self>) -> BackgroundTask {
        let cache = Arc::clone(self);
        BackgroundTask::every("state-refresh", self.config.refresh_period, move || {
            let cache = Arc::clone(&cache);
            async move {
                cache.refresh().await;
            }
        })
    }

    async fn fetch(&self) -> Result<StateSnapshot, (RemoteError, String)> {
        let timeout = self.config.get_timeout;
        let payload = tokio::time::timeout(timeout, self.remote.get_state())
            .await
            .map_err(|_| RemoteError::Timeout {
                operation: "get_state",
                timeout,
            })
            .and_then(|result| result)
            .map_err(|err| {
                let message = format!("get_state call failed: {}", describe(&err));
                (err, message)
            })?;

        serde_json::from_str(&payload).map_err(|err| {
            let message = format!("failed to decode remote state: {err}");
            (RemoteError::Decode(err), message)
        })
    }

    async fn reload(&self) -> (RefreshStatus, Result<(), RemoteError>) {
        let fetched = self.fetch().await;

        let mut cached = self.cached.write().await;
        match fetched {
            Ok(snapshot) => {
                cached.snapshot = snapshot;
                cached.status = RefreshStatus::succeeded(plughub_domain::time::now().timestamp());
                tracing::debug!(devices = cached.snapshot.len(), "state refreshed");
                (cached.status.clone(), Ok(()))
            }
            Err((err, message)) => {
                tracing::warn!(%message, "state refresh failed");
                cached.status = cached.status.failed(message);
                (cached.status.clone(), Err(err))
            }
        }
    }
}

/// Render an error and its sources as `outer: inner: …`.
fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
