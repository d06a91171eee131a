//! Periodic background tasks with an explicit shutdown signal.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A spawned loop that runs a job once per period until shut down.
///
/// The loop stops when [`shutdown`](Self::shutdown) is called or when the
/// handle is dropped. A job that is already running is allowed to finish.
pub struct BackgroundTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `job` every `period`, starting immediately.
    ///
    /// A slow job delays the following ticks instead of causing a burst.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn every<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut signal) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(task = name, ?period, "background task started");
            loop {
                tokio::select! {
                    _ = signal.changed() => break,
                    _ = ticker.tick() => job().await,
                }
            }
            tracing::debug!(task = name, "background task stopped");
        });

        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Name given at spawn time.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::warn!(task = self.name, %err, "background task ended abnormally");
        }
    }
}
