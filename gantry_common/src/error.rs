//! Device error types.

use thiserror::Error;

/// Error raised by the device layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// A required actuator group was configured with zero members.
    #[error("actuator group '{0}' has no members")]
    EmptyGroup(String),

    /// A device reported a state outside the expected set.
    #[error("unexpected device state: {0}")]
    UnexpectedState(String),
}
