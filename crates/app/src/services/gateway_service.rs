//! Gateway service — the use-cases behind the inbound API.
//!
//! This is where boundary validation happens: snapshots must only name known
//! devices with values in `{0, 1}`, rules must respect the minimum repeat
//! interval. The cache and the scheduler below trust what they are given.

use std::collections::HashSet;
use std::sync::Arc;

use plughub_domain::device::Device;
use plughub_domain::error::PlugHubError;
use plughub_domain::id::DeviceId;
use plughub_domain::rule::Rule;
use plughub_domain::state::{RefreshStatus, StateSnapshot};

use crate::ports::{ConfigStore, RemoteStateClient};
use crate::rule_scheduler::RuleScheduler;
use crate::state_cache::StateCache;

/// Everything the gateway knows, in one read.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayStatus {
    pub state: StateSnapshot,
    pub refresh: RefreshStatus,
    pub rules: Vec<Rule>,
    pub devices: Vec<Device>,
}

/// Application service combining the cache, the scheduler and the store.
pub struct GatewayService<C, R> {
    store: C,
    cache: Arc<StateCache<R>>,
    scheduler: Arc<RuleScheduler<C, R>>,
}

impl<C, R> GatewayService<C, R>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    /// Create a new service over already-running components.
    pub fn new(store: C, cache: Arc<StateCache<R>>, scheduler: Arc<RuleScheduler<C, R>>) -> Self {
        Self {
            store,
            cache,
            scheduler,
        }
    }

    /// Current cached snapshot and refresh outcome.
    pub async fn snapshot(&self) -> (StateSnapshot, RefreshStatus) {
        self.cache.snapshot().await
    }

    /// Validate `target` and apply it on the remote.
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::Validation`] when `target` names an unknown
    /// device or carries a value other than 0 or 1, [`PlugHubError::Remote`]
    /// when the remote fails or refuses the write, or a persistence error if
    /// the device list cannot be read.
    #[tracing::instrument(skip_all, fields(devices = target.len()))]
    pub async fn set_state(&self, target: StateSnapshot) -> Result<(), PlugHubError> {
        let known = self.known_devices().await?;
        target.validate(&known)?;
        self.cache.set_state(target).await
    }

    /// Copy of the current rule list.
    pub async fn rules(&self) -> Vec<Rule> {
        self.scheduler.rules().await
    }

    /// Validate every rule, then replace the rule list.
    ///
    /// The list is accepted or refused as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::Validation`] for the first invalid rule, or a
    /// persistence error from the store.
    #[tracing::instrument(skip_all, fields(rules = rules.len()))]
    pub async fn set_rules(&self, rules: Vec<Rule>) -> Result<(), PlugHubError> {
        let known = self.known_devices().await?;
        for rule in &rules {
            rule.validate(&known).inspect_err(|err| {
                tracing::debug!(rule = %rule.name, error = %err, "rule refused");
            })?;
        }
        self.scheduler.set_rules(rules).await
    }

    /// Device list from the store.
    ///
    /// # Errors
    ///
    /// Returns a persistence error from the store.
    pub async fn devices(&self) -> Result<Vec<Device>, PlugHubError> {
        self.store.get_devices().await
    }

    /// Ids accepted in snapshots and rule targets: every stored device plus
    /// every device the remote currently reports.
    ///
    /// # Errors
    ///
    /// Returns a persistence error from the store.
    pub async fn known_devices(&self) -> Result<HashSet<DeviceId>, PlugHubError> {
        let mut known: HashSet<DeviceId> = self
            .store
            .get_devices()
            .await?
            .into_iter()
            .map(|device| device.id)
            .collect();
        let (snapshot, _) = self.cache.snapshot().await;
        known.extend(snapshot.devices().cloned());
        Ok(known)
    }

    /// Snapshot, refresh status, rules and devices together.
    ///
    /// # Errors
    ///
    /// Returns a persistence error from the store.
    pub async fn status(&self) -> Result<GatewayStatus, PlugHubError> {
        let (state, refresh) = self.cache.snapshot().await;
        Ok(GatewayStatus {
            state,
            refresh,
            rules: self.scheduler.rules().await,
            devices: self.store.get_devices().await?,
        })
    }
}
