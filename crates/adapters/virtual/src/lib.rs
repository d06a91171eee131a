//! # plughub-adapter-virtual
//!
//! Simulated device controller implementing
//! [`RemoteStateClient`](plughub_app::ports::RemoteStateClient), so the gateway
//! can run without hardware.
//!
//! ## Provided devices
//!
//! | Device id | Name | Type | Initial state |
//! |-----------|------|------|---------------|
//! | `living-room-lamp` | Living room lamp | `outlet` | off |
//! | `kitchen-kettle` | Kitchen kettle | `outlet` | off |
//! | `garden-pump` | Garden pump | `relay` | off |
//!
//! Writes naming an unknown device, or carrying a value other than 0 or 1,
//! are refused the way a real controller would refuse them: the call succeeds
//! but reports no success.
//!
//! ## Dependency rule
//!
//! Depends on `plughub-app` (port traits) and `plughub-domain` only.

use std::future::Future;

use tokio::sync::Mutex;

use plughub_app::ports::RemoteStateClient;
use plughub_domain::device::Device;
use plughub_domain::error::RemoteError;
use plughub_domain::state::{DeviceState, StateSnapshot};

/// In-memory stand-in for the remote device controller.
pub struct VirtualController {
    devices: Vec<Device>,
    state: Mutex<StateSnapshot>,
}

impl Default for VirtualController {
    fn default() -> Self {
        Self::new(vec![
            Device::new("living-room-lamp", "Living room lamp", "outlet"),
            Device::new("kitchen-kettle", "Kitchen kettle", "outlet"),
            Device::new("garden-pump", "Garden pump", "relay"),
        ])
    }
}

impl VirtualController {
    /// Controller exposing `devices`, all switched off.
    #[must_use]
    pub fn new(devices: Vec<Device>) -> Self {
        let state = devices
            .iter()
            .map(|device| (device.id.clone(), DeviceState::OFF))
            .collect();
        Self {
            devices,
            state: Mutex::new(state),
        }
    }

    /// Devices this controller simulates.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }
}

impl RemoteStateClient for VirtualController {
    fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
        async move {
            let state = self.state.lock().await;
            serde_json::to_string(&*state).map_err(RemoteError::Encode)
        }
    }

    fn set_state(
        &self,
        state_json: String,
    ) -> impl Future<Output = Result<bool, RemoteError>> + Send {
        async move {
            let target: StateSnapshot =
                serde_json::from_str(&state_json).map_err(RemoteError::Decode)?;

            let mut state = self.state.lock().await;
            let refused = target
                .iter()
                .find(|(id, value)| !value.is_valid() || !state.contains(id.as_str()));
            if let Some((id, value)) = refused {
                tracing::debug!(device = %id, %value, "virtual controller refused write");
                return Ok(false);
            }

            for (id, value) in target.iter() {
                state.insert(id.clone(), value);
            }
            tracing::debug!(devices = target.len(), "virtual controller applied write");
            Ok(true)
        }
    }
}
