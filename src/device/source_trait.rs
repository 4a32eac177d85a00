//! Trait abstraction for the raw event source to enable testing

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::controller::axis_store::AxisReading;
use crate::error::Result;

/// Kind of a raw input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RawEventKind {
    AxisChange,
    ButtonChange,
}

/// One raw sample from the device, with its code already in canonical form
/// (`ABS_RX`, `BTN_Y`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub code: String,
    pub value: i32,
}

impl RawEvent {
    pub fn axis(code: impl Into<String>, value: i32) -> Self {
        Self {
            kind: RawEventKind::AxisChange,
            code: code.into(),
            value,
        }
    }

    pub fn button(code: impl Into<String>, value: i32) -> Self {
        Self {
            kind: RawEventKind::ButtonChange,
            code: code.into(),
            value,
        }
    }
}

/// Bus and USB identifiers of the connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceId {
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// What the device reported about itself when it became ready.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeviceCapabilities {
    pub name: String,
    pub path: String,
    pub id: DeviceId,
    /// Absolute axes keyed by canonical code name.
    pub axes: BTreeMap<String, AxisReading>,
    /// Canonical names of the supported buttons.
    pub buttons: Vec<String>,
}

impl DeviceCapabilities {
    /// Reported reading for an axis code, if the device has it.
    #[must_use]
    pub fn axis(&self, code: &str) -> Option<&AxisReading> {
        self.axes.get(code)
    }
}

/// A bound, ready device handle.
///
/// The handle is owned by exactly one supervisor and released with `close`.
#[async_trait]
pub trait InputSource: Send {
    /// Capabilities captured when the handle was opened.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Waits for the next recognized raw event.
    ///
    /// An error means the source is no longer usable.
    async fn next_event(&mut self) -> Result<RawEvent>;

    /// Releases the underlying device. Idempotent.
    fn close(&mut self);
}

/// Opens input sources.
#[async_trait]
pub trait DeviceConnector: Send {
    type Source: InputSource;

    /// Opens the device and queries its capabilities.
    async fn connect(&mut self) -> Result<Self::Source>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::RcBridgeError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock source replaying a scripted list of events
    ///
    /// Once the script is exhausted `next_event` never resolves, like an idle
    /// controller.
    pub struct MockSource {
        pub capabilities: DeviceCapabilities,
        pub events: VecDeque<Result<RawEvent>>,
        pub closes: Arc<AtomicUsize>,
    }

    impl MockSource {
        pub fn new(capabilities: DeviceCapabilities) -> Self {
            Self {
                capabilities,
                events: VecDeque::new(),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_event(mut self, event: RawEvent) -> Self {
            self.events.push_back(Ok(event));
            self
        }

        pub fn with_error(mut self, message: &str) -> Self {
            self.events
                .push_back(Err(RcBridgeError::DeviceUnavailable(message.to_string())));
            self
        }

        /// Counter incremented on every `close` call.
        pub fn close_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.closes)
        }
    }

    #[async_trait]
    impl InputSource for MockSource {
        fn capabilities(&self) -> &DeviceCapabilities {
            &self.capabilities
        }

        async fn next_event(&mut self) -> Result<RawEvent> {
            match self.events.pop_front() {
                Some(event) => event,
                None => std::future::pending().await,
            }
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Mock connector handing out queued connection results
    ///
    /// An empty queue behaves like an unplugged controller.
    #[derive(Clone)]
    pub struct MockConnector {
        pub results: Arc<Mutex<VecDeque<Result<MockSource>>>>,
        pub attempts: Arc<AtomicUsize>,
    }

    impl MockConnector {
        pub fn new() -> Self {
            Self {
                results: Arc::new(Mutex::new(VecDeque::new())),
                attempts: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn push_source(&self, source: MockSource) {
            self.results.lock().unwrap().push_back(Ok(source));
        }

        pub fn push_failure(&self, message: &str) {
            self.results
                .lock()
                .unwrap()
                .push_back(Err(RcBridgeError::DeviceUnavailable(message.to_string())));
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DeviceConnector for MockConnector {
        type Source = MockSource;

        async fn connect(&mut self) -> Result<MockSource> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(RcBridgeError::DeviceUnavailable(
                        "no such device".to_string(),
                    ))
                })
        }
    }

    /// Capabilities of a typical gamepad: 16-bit sticks, 10-bit triggers.
    pub fn gamepad_capabilities() -> DeviceCapabilities {
        let stick = AxisReading {
            value: 0,
            min: -32768,
            max: 32767,
            fuzz: 16,
            flat: 128,
        };
        let trigger = AxisReading {
            value: 0,
            min: 0,
            max: 1023,
            fuzz: 0,
            flat: 0,
        };

        let mut axes = BTreeMap::new();
        axes.insert("ABS_X".to_string(), stick);
        axes.insert("ABS_Y".to_string(), stick);
        axes.insert("ABS_RX".to_string(), stick);
        axes.insert("ABS_RY".to_string(), stick);
        axes.insert("ABS_Z".to_string(), trigger);
        axes.insert("ABS_RZ".to_string(), trigger);

        DeviceCapabilities {
            name: "Mock Gamepad".to_string(),
            path: "/dev/input/event-mock".to_string(),
            id: DeviceId {
                bus: 3,
                vendor: 0x045e,
                product: 0x028e,
                version: 0x0110,
            },
            axes,
            buttons: ["BTN_A", "BTN_B", "BTN_X", "BTN_Y"]
                .iter()
                .map(|b| b.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;

    #[test]
    fn test_raw_event_constructors() {
        let axis = RawEvent::axis("ABS_RX", -5);
        assert_eq!(axis.kind, RawEventKind::AxisChange);
        assert_eq!(axis.code, "ABS_RX");
        assert_eq!(axis.value, -5);

        let button = RawEvent::button("BTN_Y", 1);
        assert_eq!(button.kind, RawEventKind::ButtonChange);
    }

    #[test]
    fn test_capabilities_axis_lookup() {
        let caps = gamepad_capabilities();
        assert_eq!(caps.axis("ABS_RZ").map(|a| a.max), Some(1023));
        assert!(caps.axis("ABS_HAT0X").is_none());
    }

    #[tokio::test]
    async fn test_mock_source_replays_script() {
        let mut source = MockSource::new(gamepad_capabilities())
            .with_event(RawEvent::button("BTN_Y", 1))
            .with_error("unplugged");

        assert_eq!(source.next_event().await.unwrap(), RawEvent::button("BTN_Y", 1));
        assert!(source.next_event().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_connector_defaults_to_failure() {
        let mut connector = MockConnector::new();
        assert!(connector.connect().await.is_err());
        assert_eq!(connector.attempts(), 1);
    }
}
