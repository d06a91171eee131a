//! Device — descriptive metadata for a controllable device.
//!
//! Devices are owned by the configuration store; the core only reads them to
//! know which identifiers are valid targets.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// A device known to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Free-form device kind (`"outlet"`, `"bulb"`, …).
    #[serde(rename = "type")]
    pub kind: String,
}

impl Device {
    /// Create a device record.
    #[must_use]
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
        }
    }
}
