//! Controller error types.

use gantry_common::DeviceError;
use thiserror::Error;

/// Configuration loading/validation error. Reported once at setup;
/// a controller that fails construction never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),

    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),

    /// A required device is missing or unusable.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// No storage bays found; the capacity threshold cannot be
    /// computed.
    #[error("no storage bays with non-zero capacity")]
    NoStorage,
}

/// Error raised while advancing sweep work. There is no internal
/// catch-and-retry: a failing step propagates to the tick handler,
/// which leaves the controller in its last safe state.
#[derive(Debug, Error)]
pub enum SweepError {
    /// A device reported a fatal condition mid-step.
    #[error(transparent)]
    Device(#[from] DeviceError),
}
