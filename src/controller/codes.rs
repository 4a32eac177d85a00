//! # Input Codes
//!
//! Closed set of evdev identifiers the input engine understands, plus the
//! translation from kernel codes to canonical names.
//!
//! ## Tracked Axes (EV_ABS)
//!
//! | Axis | evdev Code | Description |
//! |------|------------|-------------|
//! | Right Stick X | ABS_RX | Steering |
//! | Right Trigger | ABS_RZ | Forward throttle |
//! | Left Trigger | ABS_Z | Reverse throttle |
//!
//! ## Button Names (EV_KEY)
//!
//! Button codes are normalized by stripping the `BTN_` prefix and lower-casing,
//! so `BTN_Y` becomes `y`. The positional aliases (`south`, `east`, `north`,
//! `west`) resolve to the same buttons as their letter names.
//!
//! ```
//! use rc_car_bridge::controller::codes::{normalize_button_name, Button, InputCode, TrackedAxis};
//!
//! assert_eq!(normalize_button_name("BTN_Y"), "y");
//! assert_eq!(InputCode::parse("BTN_Y"), InputCode::Button(Button::Y));
//! assert_eq!(InputCode::parse("ABS_RX"), InputCode::Axis(TrackedAxis::RightX));
//! assert_eq!(InputCode::parse("ABS_HAT0X"), InputCode::Unrecognized);
//! ```

use evdev::{AbsoluteAxisType, Key};

/// Device-specific prefix carried by every gamepad button code.
pub const BUTTON_PREFIX: &str = "BTN_";

/// The three axes that feed the control representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackedAxis {
    /// Right stick X (steering).
    RightX,
    /// Right trigger (forward throttle).
    RightZ,
    /// Left trigger (reverse throttle).
    LeftZ,
}

impl TrackedAxis {
    /// All tracked axes, in seeding order.
    pub const ALL: [TrackedAxis; 3] = [TrackedAxis::RightX, TrackedAxis::RightZ, TrackedAxis::LeftZ];

    /// Canonical evdev code name for this axis.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            TrackedAxis::RightX => "ABS_RX",
            TrackedAxis::RightZ => "ABS_RZ",
            TrackedAxis::LeftZ => "ABS_Z",
        }
    }

    /// Resolves a canonical evdev code name to a tracked axis.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|axis| axis.code() == code)
    }
}

/// Gamepad buttons recognized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Tl,
    Tr,
    Tl2,
    Tr2,
    Select,
    Start,
    Mode,
    ThumbL,
    ThumbR,
}

impl Button {
    /// Resolves a normalized button name (see [`normalize_button_name`]).
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_car_bridge::controller::codes::Button;
    ///
    /// assert_eq!(Button::from_name("y"), Some(Button::Y));
    /// assert_eq!(Button::from_name("west"), Some(Button::Y));
    /// assert_eq!(Button::from_name("trigger_happy1"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let button = match name {
            "a" | "south" => Button::A,
            "b" | "east" => Button::B,
            "x" | "north" => Button::X,
            "y" | "west" => Button::Y,
            "tl" => Button::Tl,
            "tr" => Button::Tr,
            "tl2" => Button::Tl2,
            "tr2" => Button::Tr2,
            "select" => Button::Select,
            "start" => Button::Start,
            "mode" => Button::Mode,
            "thumbl" => Button::ThumbL,
            "thumbr" => Button::ThumbR,
            _ => return None,
        };
        Some(button)
    }

    /// Normalized name of this button.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Button::A => "a",
            Button::B => "b",
            Button::X => "x",
            Button::Y => "y",
            Button::Tl => "tl",
            Button::Tr => "tr",
            Button::Tl2 => "tl2",
            Button::Tr2 => "tr2",
            Button::Select => "select",
            Button::Start => "start",
            Button::Mode => "mode",
            Button::ThumbL => "thumbl",
            Button::ThumbR => "thumbr",
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Strips the `BTN_` prefix from a raw button code and lower-cases the rest.
///
/// Total: codes without the prefix are only lower-cased.
#[must_use]
pub fn normalize_button_name(code: &str) -> String {
    code.strip_prefix(BUTTON_PREFIX).unwrap_or(code).to_lowercase()
}

/// A raw event code resolved against the recognized identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCode {
    Axis(TrackedAxis),
    Button(Button),
    /// Anything else; callers ignore it.
    Unrecognized,
}

impl InputCode {
    /// Resolves a canonical evdev code name.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        if let Some(axis) = TrackedAxis::from_code(code) {
            return InputCode::Axis(axis);
        }

        match Button::from_name(&normalize_button_name(code)) {
            Some(button) => InputCode::Button(button),
            None => InputCode::Unrecognized,
        }
    }
}

/// Canonical kernel name for a gamepad absolute axis.
///
/// Returns `None` for axes a gamepad source does not forward (gyro,
/// accelerometer, etc.).
#[must_use]
pub fn axis_code_name(axis: AbsoluteAxisType) -> Option<&'static str> {
    let name = match axis {
        AbsoluteAxisType::ABS_X => "ABS_X",
        AbsoluteAxisType::ABS_Y => "ABS_Y",
        AbsoluteAxisType::ABS_Z => "ABS_Z",
        AbsoluteAxisType::ABS_RX => "ABS_RX",
        AbsoluteAxisType::ABS_RY => "ABS_RY",
        AbsoluteAxisType::ABS_RZ => "ABS_RZ",
        AbsoluteAxisType::ABS_HAT0X => "ABS_HAT0X",
        AbsoluteAxisType::ABS_HAT0Y => "ABS_HAT0Y",
        _ => return None,
    };
    Some(name)
}

/// Canonical kernel name for a gamepad key.
///
/// The kernel defines the face buttons twice (`BTN_SOUTH` == `BTN_A`, ...);
/// the letter names are used.
#[must_use]
pub fn key_code_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::BTN_SOUTH => "BTN_A",
        Key::BTN_EAST => "BTN_B",
        Key::BTN_NORTH => "BTN_X",
        Key::BTN_WEST => "BTN_Y",
        Key::BTN_TL => "BTN_TL",
        Key::BTN_TR => "BTN_TR",
        Key::BTN_TL2 => "BTN_TL2",
        Key::BTN_TR2 => "BTN_TR2",
        Key::BTN_SELECT => "BTN_SELECT",
        Key::BTN_START => "BTN_START",
        Key::BTN_MODE => "BTN_MODE",
        Key::BTN_THUMBL => "BTN_THUMBL",
        Key::BTN_THUMBR => "BTN_THUMBR",
        Key::KEY_HOMEPAGE => "KEY_HOMEPAGE",
        _ => return None,
    };
    Some(name)
}
