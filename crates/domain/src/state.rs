//! Device state — on/off values, snapshots of all devices, refresh outcome.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;

/// On/off value of a single device.
///
/// Stored as an integer so the remote controller can report richer values in
/// the future; inbound writes are validated to exactly [`OFF`](Self::OFF) or
/// [`ON`](Self::ON).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(i64);

impl DeviceState {
    pub const OFF: Self = Self(0);
    pub const ON: Self = Self(1);

    /// Wrap a raw value without validation.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw integer value.
    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }

    /// Whether the value is one of the two accepted states.
    #[must_use]
    pub fn is_valid(self) -> bool {
        matches!(self.0, 0 | 1)
    }
}

impl From<bool> for DeviceState {
    fn from(on: bool) -> Self {
        if on { Self::ON } else { Self::OFF }
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// State of every known device at a point in time.
///
/// Snapshots are plain owned values: every copy handed across a component
/// boundary is a clone, so no caller can observe another's mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(BTreeMap<DeviceId, DeviceState>);

impl StateSnapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, device: impl Into<DeviceId>, state: DeviceState) -> Self {
        self.0.insert(device.into(), state);
        self
    }

    /// Set the state of `device`, returning the previous value.
    pub fn insert(&mut self, device: DeviceId, state: DeviceState) -> Option<DeviceState> {
        self.0.insert(device, state)
    }

    /// State of `device`, if present.
    #[must_use]
    pub fn get(&self, device: &str) -> Option<DeviceState> {
        self.0.get(device).copied()
    }

    #[must_use]
    pub fn contains(&self, device: &str) -> bool {
        self.0.contains_key(device)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(device, state)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, DeviceState)> {
        self.0.iter().map(|(id, state)| (id, *state))
    }

    /// Identifiers present in this snapshot.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.0.keys()
    }

    /// Whether every entry of `target` has the same value here.
    #[must_use]
    pub fn reflects(&self, target: &Self) -> bool {
        target.iter().all(|(id, state)| self.get(id.as_str()) == Some(state))
    }

    /// Check that every entry targets a known device with an accepted value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidStateValue`] for a value outside of
    /// `{0, 1}` and [`ValidationError::UnknownDevice`] for an identifier that
    /// is not in `known`.
    pub fn validate(&self, known: &HashSet<DeviceId>) -> Result<(), ValidationError> {
        for (device, state) in self.iter() {
            if !state.is_valid() {
                return Err(ValidationError::InvalidStateValue {
                    device: device.clone(),
                    value: state.value(),
                });
            }
            if !known.contains(device) {
                return Err(ValidationError::UnknownDevice(device.clone()));
            }
        }
        Ok(())
    }
}

impl FromIterator<(DeviceId, DeviceState)> for StateSnapshot {
    fn from_iter<T: IntoIterator<Item = (DeviceId, DeviceState)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of the most recent refresh against the remote controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub ok: bool,
    pub message: String,
    /// Unix time (seconds) of the last successful refresh, `0` if none yet.
    pub last_success_unix_time: i64,
}

impl RefreshStatus {
    /// Status before the first refresh attempt.
    #[must_use]
    pub fn not_started() -> Self {
        Self {
            ok: false,
            message: "not started yet".to_string(),
            last_success_unix_time: 0,
        }
    }

    /// Status after a successful refresh at `unix_time`.
    #[must_use]
    pub fn succeeded(unix_time: i64) -> Self {
        Self {
            ok: true,
            message: "OK".to_string(),
            last_success_unix_time: unix_time,
        }
    }

    /// Status after a failed refresh; keeps the last success time.
    #[must_use]
    pub fn failed(&self, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            last_success_unix_time: self.last_success_unix_time,
        }
    }
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self::not_started()
    }
}
