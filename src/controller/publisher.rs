//! # Representation Publisher
//!
//! Synchronous, ordered fan-out of engine events to subscribed observers.
//!
//! ## Events
//!
//! | Event | Published when |
//! |-------|----------------|
//! | `Error` | device acquisition fails or a bound source errors |
//! | `Device` | capabilities were acquired, before range seeding |
//! | `Representation` | any axis update, toggle flip, or device ready |
//! | `Edge` | any button rising/falling edge |
//!
//! There is no debouncing: every qualifying input produces one publish, even
//! when the computed representation is unchanged. Observers are notified in
//! subscription order on the caller's thread.

use std::fmt;

use crate::device::DeviceCapabilities;
use crate::error::RcBridgeError;

use super::representation::ControlRepresentation;
use super::toggle::ButtonEdge;

/// Something observers can react to.
#[derive(Debug, Clone, Copy)]
pub enum EngineEvent<'a> {
    Error(&'a RcBridgeError),
    Device(&'a DeviceCapabilities),
    Representation(&'a ControlRepresentation),
    Edge(ButtonEdge),
}

impl EngineEvent<'_> {
    /// Short lowercase event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Error(_) => "error",
            EngineEvent::Device(_) => "device",
            EngineEvent::Representation(_) => "representation",
            EngineEvent::Edge(_) => "edge",
        }
    }
}

/// Subscriber to engine events.
///
/// Implementations must not fail: actuator or I/O errors have to be handled
/// inside `notify` so they never reach the input event loop.
pub trait Observer {
    fn notify(&mut self, event: &EngineEvent<'_>);
}

struct FnObserver<F>(F);

impl<F> Observer for FnObserver<F>
where
    F: FnMut(&EngineEvent<'_>),
{
    fn notify(&mut self, event: &EngineEvent<'_>) {
        (self.0)(event);
    }
}

/// Ordered list of observers.
#[derive(Default)]
pub struct Publisher {
    observers: Vec<Box<dyn Observer>>,
}

impl Publisher {
    /// Creates a publisher with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer after all existing ones.
    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: Observer + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Adds a closure observer after all existing ones.
    ///
    /// ```
    /// use rc_car_bridge::controller::publisher::{EngineEvent, Publisher};
    /// use rc_car_bridge::controller::representation::ControlRepresentation;
    ///
    /// let mut publisher = Publisher::new();
    /// publisher.subscribe_fn(|event: &EngineEvent<'_>| println!("{}", event.name()));
    ///
    /// let rep = ControlRepresentation::neutral();
    /// publisher.publish(&EngineEvent::Representation(&rep));
    /// ```
    pub fn subscribe_fn<F>(&mut self, observer: F)
    where
        F: FnMut(&EngineEvent<'_>) + 'static,
    {
        self.subscribe(FnObserver(observer));
    }

    /// Delivers `event` to every observer, in subscription order.
    pub fn publish(&mut self, event: &EngineEvent<'_>) {
        for observer in &mut self.observers {
            observer.notify(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("observers", &self.observers.len())
            .finish()
    }
}
