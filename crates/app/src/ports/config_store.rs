//! Configuration store port — durable device list and rule list.

use std::future::Future;

use plughub_domain::device::Device;
use plughub_domain::error::PlugHubError;
use plughub_domain::rule::Rule;

/// Persists the device list and the rule list.
///
/// Writes are synchronous from the caller's point of view: the returned
/// future resolves once the store acknowledged the write. Rule order is
/// preserved across a write/read round-trip.
pub trait ConfigStore {
    /// All known devices.
    fn get_devices(&self) -> impl Future<Output = Result<Vec<Device>, PlugHubError>> + Send;

    /// Replace the device list.
    fn set_devices(
        &self,
        devices: Vec<Device>,
    ) -> impl Future<Output = Result<(), PlugHubError>> + Send;

    /// All rules, in insertion order.
    fn get_rules(&self) -> impl Future<Output = Result<Vec<Rule>, PlugHubError>> + Send;

    /// Replace the rule list.
    fn set_rules(&self, rules: Vec<Rule>) -> impl Future<Output = Result<(), PlugHubError>> + Send;
}

impl<T: ConfigStore + Send + Sync> ConfigStore for std::sync::Arc<T> {
    fn get_devices(&self) -> impl Future<Output = Result<Vec<Device>, PlugHubError>> + Send {
        (**self).get_devices()
    }

    fn set_devices(
        &self,
        devices: Vec<Device>,
    ) -> impl Future<Output = Result<(), PlugHubError>> + Send {
        (**self).set_devices(devices)
    }

    fn get_rules(&self) -> impl Future<Output = Result<Vec<Rule>, PlugHubError>> + Send {
        (**self).get_rules()
    }

    fn set_rules(&self, rules: Vec<Rule>) -> impl Future<Output = Result<(), PlugHubError>> + Send {
        (**self).set_rules(rules)
    }
}
