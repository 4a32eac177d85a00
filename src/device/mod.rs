//! # Device Module
//!
//! Input device acquisition and event streaming.
//!
//! This module handles:
//! - The raw event source and capability contracts
//! - Opening Linux gamepads via evdev
//! - Reconnecting with a fixed retry delay when the device is lost

pub mod evdev_source;
pub mod source_trait;
pub mod supervisor;

pub use evdev_source::{EvdevConnector, EvdevSource};
pub use source_trait::{
    DeviceCapabilities, DeviceConnector, DeviceId, InputSource, RawEvent, RawEventKind,
};
pub use supervisor::{ReconnectSupervisor, SupervisorState, DEFAULT_RETRY_DELAY};

#[cfg(test)]
pub use source_trait::mocks;
