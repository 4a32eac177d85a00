//! End-to-end flow: reconnecting device -> engine -> actuator driver.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rc_car_bridge::config::OutputConfig;
use rc_car_bridge::controller::axis_store::AxisReading;
use rc_car_bridge::controller::representation::{SteeringDirection, ThrottleDirection};
use rc_car_bridge::controller::toggle::{Accessory, AccessoryBindings};
use rc_car_bridge::controller::{EngineEvent, InputEngine};
use rc_car_bridge::device::{
    DeviceCapabilities, DeviceConnector, InputSource, RawEvent, ReconnectSupervisor,
    SupervisorState,
};
use rc_car_bridge::error::{RcBridgeError, Result};
use rc_car_bridge::output::{ActuatorObserver, Actuators, OutputDriver, Relay, Servo};

// ==================== Device Fakes ====================

struct ScriptedSource {
    capabilities: DeviceCapabilities,
    events: VecDeque<Result<RawEvent>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl InputSource for ScriptedSource {
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

#[derive(Clone, Default)]
struct ScriptedConnector {
    results: Arc<Mutex<VecDeque<Result<ScriptedSource>>>>,
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl DeviceConnector for ScriptedConnector {
    type Source = ScriptedSource;

    async fn connect(&mut self) -> Result<ScriptedSource> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RcBridgeError::DeviceUnavailable("no device".to_string())))
    }
}

fn capabilities(name: &str) -> DeviceCapabilities {
    let stick = AxisReading { value: 0, min: -32768, max: 32767, fuzz: 16, flat: 128 };
    let trigger = AxisReading { value: 0, min: 0, max: 1023, fuzz: 0, flat: 0 };

    let mut axes = BTreeMap::new();
    axes.insert("ABS_RX".to_string(), stick);
    axes.insert("ABS_RZ".to_string(), trigger);
    axes.insert("ABS_Z".to_string(), trigger);

    DeviceCapabilities {
        name: name.to_string(),
        path: format!("/dev/input/{}", name),
        axes,
        buttons: vec!["BTN_Y".to_string()],
        ..DeviceCapabilities::default()
    }
}

fn source(name: &str, events: Vec<Result<RawEvent>>) -> (ScriptedSource, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let source = ScriptedSource {
        capabilities: capabilities(name),
        events: events.into(),
        closes: Arc::clone(&closes),
    };
    (source, closes)
}

// ==================== Actuator Fakes ====================

type Journal = Rc<RefCell<Vec<String>>>;

struct JournalServo(&'static str, Journal);

impl Servo for JournalServo {
    fn move_to(&mut self, degrees: f64) -> Result<()> {
        self.1.borrow_mut().push(format!("{}.move_to({})", self.0, degrees));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.1.borrow_mut().push(format!("{}.stop", self.0));
        Ok(())
    }
}

struct JournalRelay(&'static str, Journal);

impl Relay for JournalRelay {
    fn open(&mut self) -> Result<()> {
        self.1.borrow_mut().push(format!("{}.open", self.0));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.1.borrow_mut().push(format!("{}.close", self.0));
        Ok(())
    }
}

fn journal_actuators(journal: &Journal) -> Actuators {
    Actuators {
        steering: Box::new(JournalServo("steering", Rc::clone(journal))),
        throttle: Box::new(JournalServo("throttle", Rc::clone(journal))),
        throttle_enable: Box::new(JournalRelay("enable", Rc::clone(journal))),
        throttle_direction: Box::new(JournalRelay("direction", Rc::clone(journal))),
        light_bar: Box::new(JournalRelay("light", Rc::clone(journal))),
    }
}

fn position(journal: &[String], entry: &str) -> usize {
    journal
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{} not found in {:?}", entry, journal))
}

// ==================== Flow Tests ====================

#[tokio::test(start_paused = true)]
async fn test_unplug_and_reconnect_flow() {
    let connector = ScriptedConnector::default();
    let (first, first_closes) = source(
        "event0",
        vec![
            Ok(RawEvent::axis("ABS_RX", 32767)),
            Ok(RawEvent::axis("ABS_RZ", 1023)),
            Ok(RawEvent::button("BTN_Y", 1)),
            Ok(RawEvent::button("BTN_Y", 1)),
            Err(RcBridgeError::DeviceUnavailable("unplugged".to_string())),
        ],
    );
    let (second, second_closes) = source("event1", vec![]);
    {
        let mut results = connector.results.lock().unwrap();
        results.push_back(Err(RcBridgeError::DeviceUnavailable("not yet".to_string())));
        results.push_back(Ok(first));
        results.push_back(Ok(second));
    }

    let journal = Journal::default();
    let mut engine = InputEngine::new(AccessoryBindings::default());
    let driver = OutputDriver::new(journal_actuators(&journal)).unwrap();
    engine.subscribe(ActuatorObserver::new(driver, &OutputConfig::default()));

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe_fn(move |event: &EngineEvent<'_>| sink.borrow_mut().push(event.name()));

    let mut supervisor =
        ReconnectSupervisor::new(connector.clone(), engine, Duration::from_millis(1000));
    supervisor.run(tokio::time::sleep(Duration::from_secs(10))).await;

    // Failed at 0 ms, bound the first device at 1000 ms, the second at 2000 ms
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(first_closes.load(Ordering::SeqCst), 1);
    assert_eq!(second_closes.load(Ordering::SeqCst), 1);
    assert_eq!(supervisor.state(), SupervisorState::Idle);

    // Toggle flipped once despite the repeated press
    assert!(supervisor.engine().toggles().get(Accessory::FrontLightBar));

    // The second device seeds its own resting values; the toggle survives
    let rep = supervisor.engine().representation();
    assert_eq!(rep.steering.direction, SteeringDirection::Center);
    assert_eq!(rep.throttle.direction, ThrottleDirection::Stopped);
    assert!(rep.accessories.front_light_bar);

    let names = events.borrow().clone();
    assert_eq!(names.iter().filter(|n| **n == "error").count(), 2);
    assert_eq!(names.iter().filter(|n| **n == "device").count(), 2);

    let journal = journal.borrow().clone();
    // Driving forward, then the unplug failsafe stops the drive
    let engaged = position(&journal, "enable.close");
    let light_on = position(&journal, "light.close");
    assert!(engaged < light_on);
    let stopped = journal[light_on..]
        .iter()
        .position(|e| e == "enable.open")
        .expect("failsafe should open the enable relay");
    assert_eq!(journal[light_on + stopped + 1], "throttle.move_to(0)");

    drop(supervisor);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_any_device() {
    let connector = ScriptedConnector::default();
    let mut supervisor = ReconnectSupervisor::new(
        connector.clone(),
        InputEngine::default(),
        Duration::from_millis(1000),
    );

    supervisor.run(tokio::time::sleep(Duration::from_millis(500))).await;

    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    assert!(!supervisor.retry_pending());
    assert_eq!(supervisor.state(), SupervisorState::Idle);
}
