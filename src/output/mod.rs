//! # Output Module
//!
//! Actuator driver boundary: turns published control representations into
//! servo and relay commands.
//!
//! ## Actuators
//!
//! | Actuator | Default wiring | Command |
//! |----------|----------------|---------|
//! | Steering servo | PCA9685 channel 3 | `45 - angle` degrees (mount is inverted) |
//! | Throttle servo | PCA9685 channel 0 | `180 * magnitude / 100` degrees |
//! | Enable relay | GPIO20 | closed = drive enabled |
//! | Direction relay | GPIO26 | open = forward, closed = reverse |
//! | Light bar relay | GPIO21 | closed = on |
//!
//! ## Backends
//!
//! - `dry-run`: every command is logged, nothing is driven
//! - `rpi`: rppal GPIO relays and a PCA9685 over I2C (`rpi` feature)

pub mod driver;
pub mod dry_run;
#[cfg(feature = "rpi")]
pub mod rpi;

pub use driver::{ActuatorObserver, OutputDriver};

use crate::config::{OutputBackend, OutputConfig};
use crate::error::Result;

/// Positional servo.
#[cfg_attr(test, mockall::automock)]
pub trait Servo {
    /// Moves to an absolute position, 0 to 180 degrees.
    fn move_to(&mut self, degrees: f64) -> Result<()>;

    /// Stops driving the servo (no pulse).
    fn stop(&mut self) -> Result<()>;
}

/// Two-state relay. `open` is the de-energized, disconnected state.
#[cfg_attr(test, mockall::automock)]
pub trait Relay {
    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// The full set of actuators on the vehicle.
pub struct Actuators {
    pub steering: Box<dyn Servo>,
    pub throttle: Box<dyn Servo>,
    pub throttle_enable: Box<dyn Relay>,
    pub throttle_direction: Box<dyn Relay>,
    pub light_bar: Box<dyn Relay>,
}

impl std::fmt::Debug for Actuators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuators").finish_non_exhaustive()
    }
}

/// Builds the actuators for the configured backend.
///
/// # Errors
///
/// Returns `Actuator` error if the hardware cannot be opened, or if the `rpi`
/// backend is selected in a build without the `rpi` feature.
pub fn build_actuators(config: &OutputConfig) -> Result<Actuators> {
    match config.backend {
        OutputBackend::DryRun => Ok(dry_run::actuators(config)),
        OutputBackend::Rpi => rpi_actuators(config),
    }
}

#[cfg(feature = "rpi")]
fn rpi_actuators(config: &OutputConfig) -> Result<Actuators> {
    rpi::actuators(config)
}

#[cfg(not(feature = "rpi"))]
fn rpi_actuators(_config: &OutputConfig) -> Result<Actuators> {
    Err(crate::error::RcBridgeError::Actuator(
        "rpi backend requested but this build lacks the rpi feature".to_string(),
    ))
}
