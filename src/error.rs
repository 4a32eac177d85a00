//! # Error Types
//!
//! Custom error types for RC Car Bridge using `thiserror`.
//!
//! Only the boundaries can fail: acquiring the input device (retried by the
//! reconnection supervisor) and applying commands to the actuators (reported
//! per call). Everything between them is total.

use thiserror::Error;

/// Main error type for RC Car Bridge
#[derive(Debug, Error)]
pub enum RcBridgeError {
    /// Input device could not be opened, queried, or read
    #[error("Input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Actuator command rejected before reaching hardware
    #[error("Invalid actuator command: {0}")]
    InvalidCommand(String),

    /// Actuator hardware errors
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for RC Car Bridge
pub type Result<T> = std::result::Result<T, RcBridgeError>;
