//! # Toggle/Edge Tracker
//!
//! Detects button press/release edges and holds accessory toggle state.
//!
//! A button that has never been seen is "unset": its first `1` counts as a
//! rising edge and its first `0` as a falling edge. Any other value (evdev
//! reports `2` for auto-repeat) is stored without producing an edge.
//!
//! ```
//! use rc_car_bridge::controller::codes::Button;
//! use rc_car_bridge::controller::toggle::{EdgeKind, EdgeTracker};
//!
//! let mut tracker = EdgeTracker::new();
//! assert_eq!(tracker.observe(Button::Y, 1).map(|e| e.kind), Some(EdgeKind::Rising));
//! assert_eq!(tracker.observe(Button::Y, 1), None);
//! assert_eq!(tracker.observe(Button::Y, 0).map(|e| e.kind), Some(EdgeKind::Falling));
//! ```

use std::collections::HashMap;

use super::codes::Button;

/// Direction of a button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// 0 -> 1, or first-ever press.
    Rising,
    /// 1 -> 0, or first-ever release.
    Falling,
}

/// A detected button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEdge {
    pub button: Button,
    pub kind: EdgeKind,
}

/// Remembers the last value of each button.
#[derive(Debug, Clone, Default)]
pub struct EdgeTracker {
    previous: HashMap<Button, i32>,
}

impl EdgeTracker {
    /// Creates a tracker with every button unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a button value and returns the edge it produced, if any.
    ///
    /// The stored value is updated unconditionally.
    pub fn observe(&mut self, button: Button, value: i32) -> Option<ButtonEdge> {
        let previous = self.previous.insert(button, value);

        let kind = match (value, previous) {
            (1, None | Some(0)) => EdgeKind::Rising,
            (0, None | Some(1)) => EdgeKind::Falling,
            _ => return None,
        };
        Some(ButtonEdge { button, kind })
    }

    /// Last value recorded for a button, `None` while unset.
    #[must_use]
    pub fn previous(&self, button: Button) -> Option<i32> {
        self.previous.get(&button).copied()
    }

    /// Forgets every button, returning them to unset.
    pub fn clear(&mut self) {
        self.previous.clear();
    }
}

/// Accessories driven by a toggle button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessory {
    FrontLightBar,
}

/// Which button toggles which accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessoryBindings {
    pub front_light_bar: Button,
}

impl Default for AccessoryBindings {
    fn default() -> Self {
        Self {
            front_light_bar: Button::Y,
        }
    }
}

impl AccessoryBindings {
    /// Accessory bound to `button`, if any.
    #[must_use]
    pub fn accessory_for(&self, button: Button) -> Option<Accessory> {
        (button == self.front_light_bar).then_some(Accessory::FrontLightBar)
    }
}

/// On/off state of each accessory. Everything starts off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleState {
    front_light_bar: bool,
}

impl ToggleState {
    /// Creates a state with every accessory off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of an accessory.
    #[must_use]
    pub fn get(&self, accessory: Accessory) -> bool {
        match accessory {
            Accessory::FrontLightBar => self.front_light_bar,
        }
    }

    /// Inverts an accessory and returns its new state.
    pub fn flip(&mut self, accessory: Accessory) -> bool {
        let slot = match accessory {
            Accessory::FrontLightBar => &mut self.front_light_bar,
        };
        *slot = !*slot;
        *slot
    }
}
