//! # Output Driver
//!
//! `apply_representation` contract between the input engine and the actuators.
//!
//! ## Command Rules
//!
//! - Steering angles that are non-finite or outside -45 to 45 are rejected
//!   with `InvalidCommand`; the servo keeps its last position.
//! - Throttle magnitude is clamped to 0 to 100; non-finite stops the drive and
//!   is rejected.
//! - Throttle and light are applied even when another field is rejected.
//! - The direction relay is only switched while the enable relay is open.
//! - A command equal to the last applied value is not written again.
//!
//! ## Safe State
//!
//! Applied on construction and again on drop, in this order: enable relay
//! open, direction relay open, light relay open, throttle servo stopped,
//! steering servo stopped.

use tracing::{debug, info, warn};

use crate::config::OutputConfig;
use crate::controller::publisher::{EngineEvent, Observer};
use crate::controller::representation::{
    ControlRepresentation, Throttle, ThrottleDirection, STEERING_ANGLE_MAX, STEERING_ANGLE_MIN,
    THROTTLE_MAGNITUDE_MAX, THROTTLE_MAGNITUDE_MIN,
};
use crate::error::{RcBridgeError, Result};

use super::Actuators;

/// Servo travel used for full throttle.
const THROTTLE_SERVO_MAX_DEGREES: f64 = 180.0;

/// Drives the actuators from control representations.
pub struct OutputDriver {
    actuators: Actuators,
    steering_degrees: Option<f64>,
    throttle_degrees: Option<f64>,
    drive_enabled: Option<bool>,
    reverse_selected: Option<bool>,
    light_bar_on: Option<bool>,
}

impl OutputDriver {
    /// Takes ownership of the actuators and drives them to the safe state.
    ///
    /// # Errors
    ///
    /// Returns the first actuator error hit while applying the safe state.
    pub fn new(actuators: Actuators) -> Result<Self> {
        let mut driver = Self {
            actuators,
            steering_degrees: None,
            throttle_degrees: None,
            drive_enabled: None,
            reverse_selected: None,
            light_bar_on: None,
        };
        driver.safe_state()?;
        info!("Actuators initialized in safe state");
        Ok(driver)
    }

    /// Applies a representation.
    ///
    /// A malformed field never blocks the others: a bad steering angle leaves
    /// the steering servo where it is, and a non-finite throttle magnitude
    /// stops the drive. Throttle and light are always written.
    ///
    /// # Errors
    ///
    /// - `InvalidCommand`: steering angle or throttle magnitude malformed,
    ///   reported after the remaining fields were applied
    /// - `Actuator`: a hardware write failed; the failed actuator is rewritten
    ///   on the next call
    pub fn apply_representation(&mut self, representation: &ControlRepresentation) -> Result<()> {
        let mut rejected = None;

        let angle = representation.steering.angle;
        if angle.is_finite() && (STEERING_ANGLE_MIN..=STEERING_ANGLE_MAX).contains(&angle) {
            self.set_steering_angle(angle)?;
        } else {
            rejected = Some(RcBridgeError::InvalidCommand(format!(
                "requested steering angle {} outside bounds of {} to {}",
                angle, STEERING_ANGLE_MIN, STEERING_ANGLE_MAX
            )));
        }

        let magnitude = representation.throttle.magnitude;
        if magnitude.is_finite() {
            self.set_throttle(&representation.throttle)?;
        } else {
            self.set_throttle(&Throttle::STOPPED)?;
            rejected.get_or_insert(RcBridgeError::InvalidCommand(format!(
                "throttle magnitude {} is not a number",
                magnitude
            )));
        }

        self.set_light_bar(representation.accessories.front_light_bar)?;

        match rejected {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stops the drive: enable relay open and throttle servo at 0.
    ///
    /// # Errors
    ///
    /// Returns `Actuator` error if a write fails.
    pub fn failsafe(&mut self) -> Result<()> {
        let before = (self.drive_enabled, self.throttle_degrees);
        self.set_throttle(&Throttle::STOPPED)?;

        if (self.drive_enabled, self.throttle_degrees) == before {
            debug!("Failsafe: throttle already stopped");
        } else {
            warn!("Failsafe: throttle stopped");
        }
        Ok(())
    }

    /// Drives every actuator to the safe state unconditionally.
    ///
    /// All actuators are attempted even if one fails; the first error is
    /// returned.
    pub fn safe_state(&mut self) -> Result<()> {
        let results = [
            self.actuators.throttle_enable.open(),
            self.actuators.throttle_direction.open(),
            self.actuators.light_bar.open(),
            self.actuators.throttle.stop(),
            self.actuators.steering.stop(),
        ];

        self.drive_enabled = results[0].is_ok().then_some(false);
        self.reverse_selected = results[1].is_ok().then_some(false);
        self.light_bar_on = results[2].is_ok().then_some(false);
        self.throttle_degrees = None;
        self.steering_degrees = None;

        results.into_iter().collect()
    }

    fn set_steering_angle(&mut self, angle: f64) -> Result<()> {
        let degrees = STEERING_ANGLE_MAX - angle;
        if self.steering_degrees == Some(degrees) {
            return Ok(());
        }

        self.steering_degrees = None;
        self.actuators.steering.move_to(degrees)?;
        self.steering_degrees = Some(degrees);
        Ok(())
    }

    fn set_throttle(&mut self, throttle: &Throttle) -> Result<()> {
        match throttle.direction {
            ThrottleDirection::Stopped => self.set_drive_enabled(false)?,
            ThrottleDirection::Forward => self.engage(false)?,
            ThrottleDirection::Reverse => self.engage(true)?,
        }

        let magnitude = throttle
            .magnitude
            .clamp(THROTTLE_MAGNITUDE_MIN, THROTTLE_MAGNITUDE_MAX);
        let degrees = THROTTLE_SERVO_MAX_DEGREES * magnitude / THROTTLE_MAGNITUDE_MAX;
        if self.throttle_degrees == Some(degrees) {
            return Ok(());
        }

        self.throttle_degrees = None;
        self.actuators.throttle.move_to(degrees)?;
        self.throttle_degrees = Some(degrees);
        Ok(())
    }

    /// Selects a direction and enables the drive. The enable relay is opened
    /// before the direction relay moves.
    fn engage(&mut self, reverse: bool) -> Result<()> {
        if self.reverse_selected != Some(reverse) {
            self.set_drive_enabled(false)?;

            self.reverse_selected = None;
            if reverse {
                self.actuators.throttle_direction.close()?;
            } else {
                self.actuators.throttle_direction.open()?;
            }
            self.reverse_selected = Some(reverse);
            debug!(reverse, "Throttle direction switched");
        }

        self.set_drive_enabled(true)
    }

    fn set_drive_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.drive_enabled == Some(enabled) {
            return Ok(());
        }

        self.drive_enabled = None;
        if enabled {
            self.actuators.throttle_enable.close()?;
        } else {
            self.actuators.throttle_enable.open()?;
        }
        self.drive_enabled = Some(enabled);
        Ok(())
    }

    fn set_light_bar(&mut self, on: bool) -> Result<()> {
        if self.light_bar_on == Some(on) {
            return Ok(());
        }

        self.light_bar_on = None;
        if on {
            self.actuators.light_bar.close()?;
        } else {
            self.actuators.light_bar.open()?;
        }
        self.light_bar_on = Some(on);
        Ok(())
    }
}

impl Drop for OutputDriver {
    fn drop(&mut self) {
        match self.safe_state() {
            Ok(()) => info!("Actuators released"),
            Err(e) => warn!(error = %e, "Failed to release actuators"),
        }
    }
}

impl std::fmt::Debug for OutputDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputDriver")
            .field("steering_degrees", &self.steering_degrees)
            .field("throttle_degrees", &self.throttle_degrees)
            .field("drive_enabled", &self.drive_enabled)
            .field("reverse_selected", &self.reverse_selected)
            .field("light_bar_on", &self.light_bar_on)
            .finish_non_exhaustive()
    }
}

/// Observer applying every published representation to an [`OutputDriver`].
///
/// Command failures are logged and dropped so they never reach the input loop.
#[derive(Debug)]
pub struct ActuatorObserver {
    driver: OutputDriver,
    failsafe_on_disconnect: bool,
}

impl ActuatorObserver {
    pub fn new(driver: OutputDriver, config: &OutputConfig) -> Self {
        Self {
            driver,
            failsafe_on_disconnect: config.failsafe_on_disconnect,
        }
    }
}

impl Observer for ActuatorObserver {
    fn notify(&mut self, event: &EngineEvent<'_>) {
        match event {
            EngineEvent::Representation(representation) => {
                if let Err(e) = self.driver.apply_representation(representation) {
                    warn!(error = %e, "Actuator command rejected");
                }
            }
            EngineEvent::Error(_) if self.failsafe_on_disconnect => {
                if let Err(e) = self.driver.failsafe() {
                    warn!(error = %e, "Failsafe command failed");
                }
            }
            _ => {}
        }
    }
}
