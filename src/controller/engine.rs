//! # Input Engine
//!
//! Single-writer owner of the axis store, edge tracker, toggle state and
//! publisher. The reconnection supervisor drives it with device lifecycle
//! callbacks and raw events; every state change is followed synchronously by
//! a publish.
//!
//! ```
//! use rc_car_bridge::controller::engine::InputEngine;
//! use rc_car_bridge::controller::publisher::EngineEvent;
//! use rc_car_bridge::controller::toggle::AccessoryBindings;
//! use rc_car_bridge::device::RawEvent;
//!
//! let mut engine = InputEngine::new(AccessoryBindings::default());
//! engine.subscribe_fn(|event: &EngineEvent<'_>| {
//!     if let EngineEvent::Representation(rep) = event {
//!         println!("light bar: {}", rep.accessories.front_light_bar);
//!     }
//! });
//!
//! engine.on_event(&RawEvent::button("BTN_Y", 1));
//! assert!(engine.representation().accessories.front_light_bar);
//! ```

use tracing::{debug, trace};

use crate::device::{DeviceCapabilities, RawEvent, RawEventKind};
use crate::error::RcBridgeError;

use super::axis_store::AxisStore;
use super::codes::{InputCode, TrackedAxis};
use super::publisher::{EngineEvent, Observer, Publisher};
use super::representation::{calculate, ControlRepresentation};
use super::toggle::{AccessoryBindings, EdgeKind, EdgeTracker, ToggleState};

/// Input-representation engine.
#[derive(Debug)]
pub struct InputEngine {
    axes: AxisStore,
    edges: EdgeTracker,
    toggles: ToggleState,
    bindings: AccessoryBindings,
    publisher: Publisher,
}

impl InputEngine {
    #[must_use]
    pub fn new(bindings: AccessoryBindings) -> Self {
        Self {
            axes: AxisStore::new(),
            edges: EdgeTracker::new(),
            toggles: ToggleState::new(),
            bindings,
            publisher: Publisher::new(),
        }
    }

    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: Observer + 'static,
    {
        self.publisher.subscribe(observer);
    }

    pub fn subscribe_fn<F>(&mut self, observer: F)
    where
        F: FnMut(&EngineEvent<'_>) + 'static,
    {
        self.publisher.subscribe_fn(observer);
    }

    /// Device acquired: announce it, seed the tracked axis ranges, then publish
    /// the initial representation.
    ///
    /// Axes the device does not report stay uncalibrated.
    pub fn on_ready(&mut self, capabilities: &DeviceCapabilities) {
        self.publisher.publish(&EngineEvent::Device(capabilities));

        for axis in TrackedAxis::ALL {
            let code = axis.code();
            if !self.axes.calibrate(code, capabilities.axis(code)) {
                debug!(axis = code, device = %capabilities.name, "Axis not reported, left uncalibrated");
            }
        }

        self.publish_representation();
    }

    /// Applies one raw event.
    ///
    /// Tracked axis changes and toggle flips publish a representation. Every
    /// button edge is published as an `Edge` event. Unrecognized codes are
    /// ignored.
    pub fn on_event(&mut self, event: &RawEvent) {
        match (event.kind, InputCode::parse(&event.code)) {
            (RawEventKind::AxisChange, InputCode::Axis(axis)) => {
                self.axes.update_value(axis, event.value);
                self.publish_representation();
            }
            (RawEventKind::ButtonChange, InputCode::Button(button)) => {
                let Some(edge) = self.edges.observe(button, event.value) else {
                    return;
                };
                debug!(button = %edge.button, kind = ?edge.kind, "Button edge");
                self.publisher.publish(&EngineEvent::Edge(edge));

                if edge.kind != EdgeKind::Rising {
                    return;
                }
                if let Some(accessory) = self.bindings.accessory_for(button) {
                    let on = self.toggles.flip(accessory);
                    debug!(accessory = ?accessory, on, "Accessory toggled");
                    self.publish_representation();
                }
            }
            _ => trace!(code = %event.code, value = event.value, "Ignoring input"),
        }
    }

    /// Reports an acquisition or source failure to observers.
    pub fn on_error(&mut self, error: &RcBridgeError) {
        self.publisher.publish(&EngineEvent::Error(error));
    }

    /// Handle released. Button history is forgotten so the first press on the
    /// next device counts as a rising edge. Axis ranges and toggles are kept
    /// until the next device reports its own.
    pub fn on_disconnect(&mut self) {
        self.edges.clear();
    }

    /// Representation for the current state.
    #[must_use]
    pub fn representation(&self) -> ControlRepresentation {
        calculate(&self.axes, &self.toggles)
    }

    #[must_use]
    pub fn axes(&self) -> &AxisStore {
        &self.axes
    }

    #[must_use]
    pub fn toggles(&self) -> &ToggleState {
        &self.toggles
    }

    fn publish_representation(&mut self) {
        let representation = self.representation();
        debug!(
            steering = ?representation.steering.direction,
            angle = representation.steering.angle,
            throttle = ?representation.throttle.direction,
            magnitude = representation.throttle.magnitude,
            light_bar = representation.accessories.front_light_bar,
            "Publishing representation"
        );
        self.publisher
            .publish(&EngineEvent::Representation(&representation));
    }
}

impl Default for InputEngine {
    fn default() -> Self {
        Self::new(AccessoryBindings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::codes::Button;
    use crate::controller::representation::{SteeringDirection, Throttle, ThrottleDirection};
    use crate::controller::toggle::{Accessory, ButtonEdge};
    use crate::device::mocks::gamepad_capabilities;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Error(String),
        Device(String),
        Representation(ControlRepresentation),
        Edge(ButtonEdge),
    }

    fn recording_engine(bindings: AccessoryBindings) -> (InputEngine, Rc<RefCell<Vec<Seen>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut engine = InputEngine::new(bindings);
        engine.subscribe_fn(move |event: &EngineEvent<'_>| {
            let entry = match event {
                EngineEvent::Error(e) => Seen::Error(e.to_string()),
                EngineEvent::Device(caps) => Seen::Device(caps.name.clone()),
                EngineEvent::Representation(rep) => Seen::Representation(**rep),
                EngineEvent::Edge(edge) => Seen::Edge(*edge),
            };
            sink.borrow_mut().push(entry);
        });
        (engine, seen)
    }

    fn representations(seen: &Rc<RefCell<Vec<Seen>>>) -> Vec<ControlRepresentation> {
        seen.borrow()
            .iter()
            .filter_map(|s| match s {
                Seen::Representation(rep) => Some(*rep),
                _ => None,
            })
            .collect()
    }

    fn light_bar_flips(seen: &Rc<RefCell<Vec<Seen>>>) -> usize {
        representations(seen)
            .iter()
            .filter(|rep| rep.accessories.front_light_bar)
            .count()
    }

    // ==================== Ready Tests ====================

    #[test]
    fn test_ready_publishes_device_then_representation() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());
        engine.on_ready(&gamepad_capabilities());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Seen::Device("Mock Gamepad".to_string()));

        // Raw 0 on an asymmetric -32768..32767 stick sits a hair right of center
        let Seen::Representation(rep) = &seen[1] else {
            panic!("expected a representation, got {:?}", seen[1]);
        };
        assert!(rep.steering.angle.abs() < 0.01, "angle {}", rep.steering.angle);
        assert_eq!(rep.steering.direction, SteeringDirection::Center);
        assert_eq!(rep.throttle, Throttle::STOPPED);
        assert!(!rep.accessories.front_light_bar);
    }

    #[test]
    fn test_ready_seeds_ranges() {
        let mut engine = InputEngine::default();
        engine.on_ready(&gamepad_capabilities());

        assert!(engine.axes().get(TrackedAxis::RightX).is_calibrated());
        assert_eq!(engine.axes().get(TrackedAxis::RightZ).max, 1023);
        assert_eq!(engine.axes().get(TrackedAxis::LeftZ).max, 1023);
    }

    #[test]
    fn test_ready_tolerates_missing_axes() {
        let mut caps = gamepad_capabilities();
        caps.axes.remove("ABS_Z");

        let (mut engine, seen) = recording_engine(AccessoryBindings::default());
        engine.on_ready(&caps);

        assert!(!engine.axes().get(TrackedAxis::LeftZ).is_calibrated());
        assert_eq!(representations(&seen).len(), 1);

        // Reverse can never engage on an uncalibrated trigger
        engine.on_event(&RawEvent::axis("ABS_Z", 1023));
        assert_eq!(engine.representation().throttle.direction, ThrottleDirection::Stopped);
    }

    // ==================== Axis Event Tests ====================

    #[test]
    fn test_steering_end_to_end() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());
        engine.on_ready(&gamepad_capabilities());

        engine.on_event(&RawEvent::axis("ABS_RX", 0));
        engine.on_event(&RawEvent::axis("ABS_RX", 32767));

        let reps = representations(&seen);
        assert_eq!(reps.len(), 3);

        assert!(reps[1].steering.angle.abs() < 0.01);
        assert_eq!(reps[1].steering.direction, SteeringDirection::Center);

        assert_eq!(reps[2].steering.angle, 45.0);
        assert_eq!(reps[2].steering.direction, SteeringDirection::Right);
    }

    #[test]
    fn test_every_axis_event_publishes() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());
        engine.on_ready(&gamepad_capabilities());

        for _ in 0..3 {
            engine.on_event(&RawEvent::axis("ABS_RZ", 0));
        }
        assert_eq!(representations(&seen).len(), 4);
    }

    #[test]
    fn test_untracked_axis_ignored() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());
        engine.on_ready(&gamepad_capabilities());
        let before = seen.borrow().len();

        engine.on_event(&RawEvent::axis("ABS_X", 1000));
        engine.on_event(&RawEvent::axis("ABS_HAT0X", -1));
        engine.on_event(&RawEvent::button("KEY_HOMEPAGE", 1));

        assert_eq!(seen.borrow().len(), before);
    }

    #[test]
    fn test_kind_and_code_must_agree() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());

        // A button code reported as an axis change is not a button press
        engine.on_event(&RawEvent::axis("BTN_Y", 1));
        engine.on_event(&RawEvent::button("ABS_RX", 1));

        assert!(seen.borrow().is_empty());
        assert!(!engine.toggles().get(Accessory::FrontLightBar));
    }

    #[test]
    fn test_forward_throttle() {
        let mut engine = InputEngine::default();
        engine.on_ready(&gamepad_capabilities());
        engine.on_event(&RawEvent::axis("ABS_RZ", 1023));

        let rep = engine.representation();
        assert_eq!(rep.throttle.direction, ThrottleDirection::Forward);
        assert_eq!(rep.throttle.magnitude, 100.0);
    }

    // ==================== Button Event Tests ====================

    #[test]
    fn test_bound_button_toggles_once_per_press() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());

        engine.on_event(&RawEvent::button("BTN_Y", 1));
        engine.on_event(&RawEvent::button("BTN_Y", 1));

        assert!(engine.toggles().get(Accessory::FrontLightBar));
        assert_eq!(representations(&seen).len(), 1);
        assert_eq!(light_bar_flips(&seen), 1);
    }

    #[test]
    fn test_release_does_not_toggle() {
        let mut engine = InputEngine::default();

        engine.on_event(&RawEvent::button("BTN_Y", 0));
        assert!(!engine.toggles().get(Accessory::FrontLightBar));

        engine.on_event(&RawEvent::button("BTN_Y", 1));
        engine.on_event(&RawEvent::button("BTN_Y", 0));
        assert!(engine.toggles().get(Accessory::FrontLightBar));

        engine.on_event(&RawEvent::button("BTN_Y", 1));
        assert!(!engine.toggles().get(Accessory::FrontLightBar));
    }

    #[test]
    fn test_all_edges_published() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());

        engine.on_event(&RawEvent::button("BTN_A", 1));
        engine.on_event(&RawEvent::button("BTN_A", 0));

        let seen = seen.borrow();
        assert_eq!(
            *seen,
            vec![
                Seen::Edge(ButtonEdge { button: Button::A, kind: EdgeKind::Rising }),
                Seen::Edge(ButtonEdge { button: Button::A, kind: EdgeKind::Falling }),
            ]
        );
    }

    #[test]
    fn test_positional_alias_reaches_binding() {
        let mut engine = InputEngine::default();
        engine.on_event(&RawEvent::button("BTN_WEST", 1));
        assert!(engine.toggles().get(Accessory::FrontLightBar));
    }

    #[test]
    fn test_custom_binding() {
        let mut engine = InputEngine::new(AccessoryBindings {
            front_light_bar: Button::Start,
        });

        engine.on_event(&RawEvent::button("BTN_Y", 1));
        assert!(!engine.toggles().get(Accessory::FrontLightBar));

        engine.on_event(&RawEvent::button("BTN_START", 1));
        assert!(engine.toggles().get(Accessory::FrontLightBar));
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_error_published() {
        let (mut engine, seen) = recording_engine(AccessoryBindings::default());
        engine.on_error(&RcBridgeError::DeviceUnavailable("unplugged".to_string()));

        assert_eq!(
            *seen.borrow(),
            vec![Seen::Error("Input device unavailable: unplugged".to_string())]
        );
    }

    #[test]
    fn test_disconnect_resets_button_history() {
        let mut engine = InputEngine::default();

        // Held through the disconnect
        engine.on_event(&RawEvent::button("BTN_Y", 1));
        engine.on_disconnect();
        engine.on_event(&RawEvent::button("BTN_Y", 1));

        assert!(!engine.toggles().get(Accessory::FrontLightBar));
    }

    #[test]
    fn test_disconnect_keeps_toggle_state() {
        let mut engine = InputEngine::default();
        engine.on_event(&RawEvent::button("BTN_Y", 1));
        engine.on_disconnect();

        assert!(engine.toggles().get(Accessory::FrontLightBar));
    }
}
