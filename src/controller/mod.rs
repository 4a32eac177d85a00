//! # Controller Module
//!
//! Gamepad input representation.
//!
//! This module handles:
//! - Resolving raw evdev codes to the tracked axes and buttons
//! - Holding axis ranges and values
//! - Button edge detection and accessory toggles
//! - Mapping input state to steering/throttle commands
//! - Publishing every recomputed representation to observers

pub mod axis_store;
pub mod codes;
pub mod engine;
pub mod publisher;
pub mod representation;
pub mod toggle;

pub use engine::InputEngine;
pub use publisher::{EngineEvent, Observer, Publisher};
pub use representation::ControlRepresentation;
