//! Logging-only actuators for running without hardware.

use tracing::info;

use crate::config::OutputConfig;
use crate::error::Result;

use super::{Actuators, Relay, Servo};

/// Servo that logs its commands.
#[derive(Debug, Clone)]
pub struct LoggedServo {
    name: &'static str,
    channel: u8,
}

impl LoggedServo {
    pub fn new(name: &'static str, channel: u8) -> Self {
        Self { name, channel }
    }
}

impl Servo for LoggedServo {
    fn move_to(&mut self, degrees: f64) -> Result<()> {
        info!(servo = self.name, channel = self.channel, degrees, "[dry-run] servo move");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        info!(servo = self.name, channel = self.channel, "[dry-run] servo stop");
        Ok(())
    }
}

/// Relay that logs its commands.
#[derive(Debug, Clone)]
pub struct LoggedRelay {
    name: &'static str,
    pin: u8,
}

impl LoggedRelay {
    pub fn new(name: &'static str, pin: u8) -> Self {
        Self { name, pin }
    }
}

impl Relay for LoggedRelay {
    fn open(&mut self) -> Result<()> {
        info!(relay = self.name, pin = self.pin, "[dry-run] relay open");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        info!(relay = self.name, pin = self.pin, "[dry-run] relay close");
        Ok(())
    }
}

/// Dry-run actuators labelled with the configured wiring.
pub fn actuators(config: &OutputConfig) -> Actuators {
    Actuators {
        steering: Box::new(LoggedServo::new("steering", config.steering_servo_channel)),
        throttle: Box::new(LoggedServo::new("throttle", config.throttle_servo_channel)),
        throttle_enable: Box::new(LoggedRelay::new("throttle_enable", config.throttle_enable_pin)),
        throttle_direction: Box::new(LoggedRelay::new(
            "throttle_direction",
            config.throttle_direction_pin,
        )),
        light_bar: Box::new(LoggedRelay::new("light_bar", config.light_bar_pin)),
    }
}
