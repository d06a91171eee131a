//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`PlugHubError`]
//! via `#[from]` (or a manual `From` impl for adapter-specific errors).

use std::time::Duration;

use crate::id::DeviceId;

/// Top-level error shared by every layer of the gateway.
#[derive(Debug, thiserror::Error)]
pub enum PlugHubError {
    /// Input rejected at the API boundary.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The remote state service failed or refused a request.
    #[error("remote state service error")]
    Remote(#[from] RemoteError),

    /// The configuration store could not be read or written.
    #[error("persistence error")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reasons an inbound snapshot or rule is refused.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A rule was submitted without a name.
    #[error("name must not be empty")]
    EmptyName,

    /// A target state references a device that is not known to the gateway.
    #[error("unknown target device {0}")]
    UnknownDevice(DeviceId),

    /// A target state value outside of `{0, 1}`.
    #[error("invalid target state {value} for device {device}")]
    InvalidStateValue {
        /// Device the value was addressed to.
        device: DeviceId,
        /// The rejected value.
        value: i64,
    },

    /// A repeating rule whose period is below the allowed minimum.
    #[error("repeat period of {actual:?} is below the minimum of {minimum:?}")]
    RepeatTooShort {
        /// The submitted period.
        actual: Duration,
        /// The smallest accepted non-zero period.
        minimum: Duration,
    },

    /// A repeating rule whose period is above the allowed maximum.
    #[error("repeat period of {actual:?} is above the maximum of {maximum:?}")]
    RepeatTooLong {
        /// The submitted period.
        actual: Duration,
        /// The largest accepted period.
        maximum: Duration,
    },
}

/// Failures talking to the remote state service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The call did not complete within its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Name of the remote operation (`get_state`, `set_state`).
        operation: &'static str,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// The remote answered but reported failure.
    #[error("remote rejected the request: {0}")]
    Rejected(String),

    /// Transport-level failure (connection refused, TLS, HTTP status, …).
    #[error("remote unreachable")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote returned a payload that is not a valid snapshot.
    #[error("failed to decode remote payload")]
    Decode(#[source] serde_json::Error),

    /// A snapshot could not be serialized for the remote.
    #[error("failed to encode snapshot")]
    Encode(#[source] serde_json::Error),
}

impl PlugHubError {
    /// Wrap any store-specific failure as a [`PlugHubError::Persistence`].
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_plughub_error() {
        let err: PlugHubError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            PlugHubError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_convert_remote_error_into_plughub_error() {
        let err: PlugHubError = RemoteError::Rejected("no success".to_string()).into();
        assert!(matches!(err, PlugHubError::Remote(RemoteError::Rejected(_))));
    }

    #[test]
    fn should_display_unknown_device() {
        let err = ValidationError::UnknownDevice(DeviceId::from("lamp"));
        assert_eq!(err.to_string(), "unknown target device lamp");
    }

    #[test]
    fn should_display_timeout_with_operation_name() {
        let err = RemoteError::Timeout {
            operation: "get_state",
            timeout: Duration::from_secs(1),
        };
        assert_eq!(err.to_string(), "get_state timed out after 1s");
    }

    #[test]
    fn should_wrap_io_error_as_persistence() {
        let io = std::io::Error::other("disk full");
        let err = PlugHubError::persistence(io);
        assert!(matches!(err, PlugHubError::Persistence(_)));
    }
}
