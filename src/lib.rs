//! # RC Car Bridge Library
//!
//! Drive an RC car from a Linux gamepad.
//!
//! This library turns raw evdev gamepad samples into a control representation
//! (steering angle and direction, throttle magnitude and direction, accessory
//! toggles) and applies it to a steering servo, a throttle servo with
//! direction relays, and a light bar relay.

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod output;
pub mod telemetry;
