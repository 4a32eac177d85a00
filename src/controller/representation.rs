//! # Representation Calculator
//!
//! Maps axis state and toggle state into a [`ControlRepresentation`].
//!
//! ## Output Ranges
//!
//! | Output | Source Axis | Range |
//! |--------|-------------|-------|
//! | Steering angle | ABS_RX | -45.0 to 45.0 degrees |
//! | Forward magnitude | ABS_RZ | 0.0 to 100.0 |
//! | Reverse magnitude | ABS_Z | 0.0 to 100.0 |
//!
//! ## Dead Zones
//!
//! Throttle magnitudes must exceed 1.0 to count as pressed. The steering label
//! is `Center` within ±2.0 degrees; the angle itself is never snapped.
//!
//! ## Usage
//!
//! ```
//! use rc_car_bridge::controller::representation::{resolve_steering, resolve_throttle,
//!     SteeringDirection, ThrottleDirection};
//!
//! let throttle = resolve_throttle(50.0, 50.0);
//! assert_eq!(throttle.direction, ThrottleDirection::Stopped); // interlock
//!
//! let steering = resolve_steering(10.0);
//! assert_eq!(steering.direction, SteeringDirection::Right);
//! ```

use serde::Serialize;

use super::axis_store::{AxisReading, AxisStore};
use super::codes::TrackedAxis;
use super::toggle::{Accessory, ToggleState};

/// Full left steering angle in degrees.
pub const STEERING_ANGLE_MIN: f64 = -45.0;
/// Full right steering angle in degrees.
pub const STEERING_ANGLE_MAX: f64 = 45.0;
/// Straight ahead.
pub const STEERING_ANGLE_CENTER: f64 = 0.0;
/// Steering direction stays `Center` while |angle| <= this.
pub const STEERING_DEAD_ZONE: f64 = 2.0;

/// Released throttle.
pub const THROTTLE_MAGNITUDE_MIN: f64 = 0.0;
/// Fully pressed throttle.
pub const THROTTLE_MAGNITUDE_MAX: f64 = 100.0;
/// A throttle magnitude must exceed this to count as pressed.
pub const THROTTLE_ACTIVE_THRESHOLD: f64 = 1.0;

/// Steering direction label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SteeringDirection {
    Left,
    Center,
    Right,
}

/// Throttle direction label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleDirection {
    Stopped,
    Forward,
    Reverse,
}

/// Steering part of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Steering {
    pub direction: SteeringDirection,
    /// Degrees, nominally -45.0 to 45.0. Not clamped.
    pub angle: f64,
}

/// Throttle part of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Throttle {
    pub direction: ThrottleDirection,
    /// Nominally 0.0 to 100.0 (not a 0-1 fraction). Not clamped.
    pub magnitude: f64,
}

impl Throttle {
    /// Drive disabled.
    pub const STOPPED: Throttle = Throttle {
        direction: ThrottleDirection::Stopped,
        magnitude: THROTTLE_MAGNITUDE_MIN,
    };
}

/// Accessory part of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessories {
    pub front_light_bar: bool,
}

/// Snapshot of intended vehicle behavior, recomputed on every relevant input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlRepresentation {
    pub steering: Steering,
    pub throttle: Throttle,
    pub accessories: Accessories,
}

impl ControlRepresentation {
    /// Wheels straight, drive stopped, accessories off.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            steering: resolve_steering(STEERING_ANGLE_CENTER),
            throttle: Throttle::STOPPED,
            accessories: Accessories::default(),
        }
    }
}

/// Linearly maps an axis reading onto `[out_min, out_max]`.
///
/// `output = (value - min) / (max - min) * (out_max - out_min) + out_min`
///
/// An uncalibrated axis (`min == max`) maps to `out_min` instead of dividing by
/// zero. Values outside `[min, max]` extrapolate past the output range.
///
/// # Examples
///
/// ```
/// use rc_car_bridge::controller::axis_store::AxisReading;
/// use rc_car_bridge::controller::representation::map_value_to_range;
///
/// let trigger = AxisReading { value: 1023, min: 0, max: 1023, fuzz: 3, flat: 63 };
/// assert_eq!(map_value_to_range(&trigger, 0.0, 100.0), 100.0);
///
/// assert_eq!(map_value_to_range(&AxisReading::UNCALIBRATED, 0.0, 100.0), 0.0);
/// ```
#[must_use]
pub fn map_value_to_range(reading: &AxisReading, out_min: f64, out_max: f64) -> f64 {
    if !reading.is_calibrated() {
        return out_min;
    }

    let in_min = f64::from(reading.min);
    let in_span = f64::from(reading.max) - in_min;
    (f64::from(reading.value) - in_min) / in_span * (out_max - out_min) + out_min
}

/// Resolves independent forward/reverse magnitudes into one throttle command.
///
/// Evaluated in order, first match wins:
/// 1. both pressed -> `Stopped`, 0 (simultaneous-press interlock)
/// 2. forward pressed -> `Forward`, forward magnitude
/// 3. reverse pressed -> `Reverse`, reverse magnitude
/// 4. otherwise -> `Stopped`, 0
#[must_use]
pub fn resolve_throttle(forward: f64, reverse: f64) -> Throttle {
    let forward_pressed = forward > THROTTLE_ACTIVE_THRESHOLD;
    let reverse_pressed = reverse > THROTTLE_ACTIVE_THRESHOLD;

    match (forward_pressed, reverse_pressed) {
        (true, false) => Throttle {
            direction: ThrottleDirection::Forward,
            magnitude: forward,
        },
        (false, true) => Throttle {
            direction: ThrottleDirection::Reverse,
            magnitude: reverse,
        },
        (true, true) | (false, false) => Throttle::STOPPED,
    }
}

/// Labels a steering angle. The angle is passed through untouched.
#[must_use]
pub fn resolve_steering(angle: f64) -> Steering {
    let direction = if angle > STEERING_DEAD_ZONE {
        SteeringDirection::Right
    } else if angle < -STEERING_DEAD_ZONE {
        SteeringDirection::Left
    } else {
        SteeringDirection::Center
    };
    Steering { direction, angle }
}

/// Computes the control representation from the current axis and toggle state.
///
/// Total: an uncalibrated steering axis yields a centered angle and
/// uncalibrated throttle axes yield zero magnitude.
#[must_use]
pub fn calculate(axes: &AxisStore, toggles: &ToggleState) -> ControlRepresentation {
    let steering_axis = axes.get(TrackedAxis::RightX);
    let angle = if steering_axis.is_calibrated() {
        map_value_to_range(steering_axis, STEERING_ANGLE_MIN, STEERING_ANGLE_MAX)
    } else {
        STEERING_ANGLE_CENTER
    };

    let forward = map_value_to_range(
        axes.get(TrackedAxis::RightZ),
        THROTTLE_MAGNITUDE_MIN,
        THROTTLE_MAGNITUDE_MAX,
    );
    let reverse = map_value_to_range(
        axes.get(TrackedAxis::LeftZ),
        THROTTLE_MAGNITUDE_MIN,
        THROTTLE_MAGNITUDE_MAX,
    );

    ControlRepresentation {
        steering: resolve_steering(angle),
        throttle: resolve_throttle(forward, reverse),
        accessories: Accessories {
            front_light_bar: toggles.get(Accessory::FrontLightBar),
        },
    }
}
