//! # Axis State Store
//!
//! Holds the current raw value and calibrated range of each tracked axis.
//!
//! Every axis starts uncalibrated (`min == max == 0`). Ranges are seeded from
//! the capabilities the device reports when it becomes ready; afterwards only
//! the `value` field changes, one raw event at a time.
//!
//! ## Usage
//!
//! ```
//! use rc_car_bridge::controller::axis_store::{AxisReading, AxisStore};
//! use rc_car_bridge::controller::codes::TrackedAxis;
//!
//! let mut store = AxisStore::new();
//! assert!(!store.get(TrackedAxis::RightX).is_calibrated());
//!
//! let capability = AxisReading { value: 0, min: -32768, max: 32767, fuzz: 255, flat: 4095 };
//! assert!(store.calibrate("ABS_RX", Some(&capability)));
//!
//! store.update_value(TrackedAxis::RightX, 32767);
//! assert_eq!(store.get(TrackedAxis::RightX).value, 32767);
//! ```

use serde::Serialize;

use super::codes::{InputCode, TrackedAxis};

/// Raw reading of one absolute axis together with its reported range.
///
/// `fuzz` and `flat` are carried for completeness; the representation
/// calculator does not use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AxisReading {
    pub value: i32,
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub flat: i32,
}

impl AxisReading {
    /// Sentinel for an axis whose range has not been reported.
    pub const UNCALIBRATED: AxisReading = AxisReading {
        value: 0,
        min: 0,
        max: 0,
        fuzz: 0,
        flat: 0,
    };

    /// Returns true when the range can be mapped (`min != max`).
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.min != self.max
    }
}

/// Current state of the three tracked axes.
///
/// No clamping is performed: values outside `[min, max]` are stored as-is and
/// map linearly past the output range.
///
/// # Thread Safety
///
/// `AxisStore` has a single writer, the input engine that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisStore {
    right_x: AxisReading,
    right_z: AxisReading,
    left_z: AxisReading,
}

impl AxisStore {
    /// Creates a store with every axis uncalibrated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reading of a tracked axis.
    #[must_use]
    pub fn get(&self, axis: TrackedAxis) -> &AxisReading {
        match axis {
            TrackedAxis::RightX => &self.right_x,
            TrackedAxis::RightZ => &self.right_z,
            TrackedAxis::LeftZ => &self.left_z,
        }
    }

    fn get_mut(&mut self, axis: TrackedAxis) -> &mut AxisReading {
        match axis {
            TrackedAxis::RightX => &mut self.right_x,
            TrackedAxis::RightZ => &mut self.right_z,
            TrackedAxis::LeftZ => &mut self.left_z,
        }
    }

    /// Seeds an axis from the capability the device reported for `code`.
    ///
    /// The reported current value is copied along with the range. Does nothing
    /// when `code` is not a tracked axis or the device did not report it.
    ///
    /// # Returns
    ///
    /// `true` if an axis was calibrated.
    pub fn calibrate(&mut self, code: &str, capability: Option<&AxisReading>) -> bool {
        let (InputCode::Axis(axis), Some(capability)) = (InputCode::parse(code), capability) else {
            return false;
        };
        *self.get_mut(axis) = *capability;
        true
    }

    /// Overwrites the raw value of a tracked axis.
    ///
    /// Accepted before calibration, in which case the calculator treats the
    /// axis as inactive.
    pub fn update_value(&mut self, axis: TrackedAxis, raw_value: i32) {
        self.get_mut(axis).value = raw_value;
    }
}
