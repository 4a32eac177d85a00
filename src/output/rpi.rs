//! # Raspberry Pi Actuators
//!
//! GPIO relays via `rppal::gpio` and servos on a PCA9685 PWM controller via
//! `rppal::i2c`.
//!
//! ## PCA9685 Setup
//!
//! | Setting | Value |
//! |---------|-------|
//! | Oscillator | 25 MHz internal |
//! | PWM frequency | 50 Hz (prescale 121) |
//! | Servo pulse | 600 to 2400 µs over 0 to 180° |
//! | Stop | channel full-off |
//!
//! Relay boards on this vehicle trigger on a high level: pins start low
//! (disconnected) and `close` drives them high.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use rppal::i2c::I2c;
use tracing::{debug, info};

use crate::config::OutputConfig;
use crate::error::{RcBridgeError, Result};

use super::{Actuators, Relay, Servo};

// Registers
const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

// MODE1 bits
const MODE1_RESTART: u8 = 0x80;
const MODE1_AUTO_INCREMENT: u8 = 0x20;
const MODE1_SLEEP: u8 = 0x10;

/// LEDn_OFF_H full-off bit.
const FULL_OFF: u16 = 0x1000;

const OSCILLATOR_HZ: f64 = 25_000_000.0;
const PWM_FREQUENCY_HZ: f64 = 50.0;
const PWM_RESOLUTION: u32 = 4096;
const PWM_PERIOD_US: u32 = 20_000;

const SERVO_MIN_PULSE_US: f64 = 600.0;
const SERVO_MAX_PULSE_US: f64 = 2400.0;
const SERVO_RANGE_DEGREES: f64 = 180.0;

fn i2c_error(e: rppal::i2c::Error) -> RcBridgeError {
    RcBridgeError::Actuator(format!("PCA9685 I2C error: {}", e))
}

fn gpio_error(pin: u8, e: rppal::gpio::Error) -> RcBridgeError {
    RcBridgeError::Actuator(format!("GPIO{} error: {}", pin, e))
}

/// Prescale register value for the servo PWM frequency.
fn prescale() -> u8 {
    let value = (OSCILLATOR_HZ / (f64::from(PWM_RESOLUTION) * PWM_FREQUENCY_HZ)).round() - 1.0;
    value.clamp(3.0, 255.0) as u8
}

/// Pulse width for a servo position, clamped to the servo's travel.
fn degrees_to_pulse_us(degrees: f64) -> f64 {
    let fraction = degrees.clamp(0.0, SERVO_RANGE_DEGREES) / SERVO_RANGE_DEGREES;
    SERVO_MIN_PULSE_US + fraction * (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US)
}

/// PWM off-tick for a pulse width.
fn pulse_to_ticks(pulse_us: f64) -> u16 {
    let ticks = (pulse_us * f64::from(PWM_RESOLUTION) / f64::from(PWM_PERIOD_US)).round();
    ticks.clamp(0.0, f64::from(PWM_RESOLUTION - 1)) as u16
}

/// PCA9685 16-channel PWM controller.
pub struct Pca9685 {
    i2c: I2c,
}

impl Pca9685 {
    /// Opens the primary I2C bus and configures the chip for 50 Hz servos.
    pub fn open(address: u16) -> Result<Self> {
        let mut i2c = I2c::new().map_err(i2c_error)?;
        i2c.set_slave_address(address).map_err(i2c_error)?;

        let mut chip = Self { i2c };
        chip.configure()?;
        info!(address = format_args!("0x{:02x}", address), "PCA9685 ready");
        Ok(chip)
    }

    fn configure(&mut self) -> Result<()> {
        // Prescale can only be written while asleep
        self.write_register(MODE1, MODE1_SLEEP)?;
        self.write_register(PRESCALE, prescale())?;
        self.write_register(MODE1, MODE1_AUTO_INCREMENT)?;

        // Oscillator needs 500 µs to stabilize before restart
        thread::sleep(Duration::from_micros(500));
        self.write_register(MODE1, MODE1_AUTO_INCREMENT | MODE1_RESTART)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .smbus_write_byte(register, value)
            .map_err(i2c_error)
    }

    fn write_channel(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        let register = LED0_ON_L + 4 * channel;
        let [on_l, on_h] = on.to_le_bytes();
        let [off_l, off_h] = off.to_le_bytes();
        self.i2c
            .write(&[register, on_l, on_h, off_l, off_h])
            .map_err(i2c_error)?;
        Ok(())
    }

    pub fn set_pulse(&mut self, channel: u8, pulse_us: f64) -> Result<()> {
        self.write_channel(channel, 0, pulse_to_ticks(pulse_us))
    }

    pub fn full_off(&mut self, channel: u8) -> Result<()> {
        self.write_channel(channel, 0, FULL_OFF)
    }
}

/// One servo on a shared PCA9685.
pub struct Pca9685Servo {
    chip: Rc<RefCell<Pca9685>>,
    channel: u8,
}

impl Servo for Pca9685Servo {
    fn move_to(&mut self, degrees: f64) -> Result<()> {
        let pulse_us = degrees_to_pulse_us(degrees);
        debug!(channel = self.channel, degrees, pulse_us, "Servo move");
        self.chip.borrow_mut().set_pulse(self.channel, pulse_us)
    }

    fn stop(&mut self) -> Result<()> {
        debug!(channel = self.channel, "Servo stop");
        self.chip.borrow_mut().full_off(self.channel)
    }
}

/// Relay on a GPIO pin, triggered high.
pub struct GpioRelay {
    pin: OutputPin,
}

impl GpioRelay {
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self> {
        let pin = gpio.get(pin).map_err(|e| gpio_error(pin, e))?.into_output_low();
        Ok(Self { pin })
    }
}

impl Relay for GpioRelay {
    fn open(&mut self) -> Result<()> {
        self.pin.set_low();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.pin.set_high();
        Ok(())
    }
}

/// Opens the configured GPIO pins and PCA9685.
pub fn actuators(config: &OutputConfig) -> Result<Actuators> {
    let gpio = Gpio::new().map_err(|e| RcBridgeError::Actuator(format!("GPIO unavailable: {}", e)))?;

    // Enable relay first so the drive is disconnected before anything else
    let throttle_enable = GpioRelay::new(&gpio, config.throttle_enable_pin)?;
    let throttle_direction = GpioRelay::new(&gpio, config.throttle_direction_pin)?;
    let light_bar = GpioRelay::new(&gpio, config.light_bar_pin)?;

    let chip = Rc::new(RefCell::new(Pca9685::open(config.pca9685_address)?));

    Ok(Actuators {
        steering: Box::new(Pca9685Servo {
            chip: Rc::clone(&chip),
            channel: config.steering_servo_channel,
        }),
        throttle: Box::new(Pca9685Servo {
            chip,
            channel: config.throttle_servo_channel,
        }),
        throttle_enable: Box::new(throttle_enable),
        throttle_direction: Box::new(throttle_direction),
        light_bar: Box::new(light_bar),
    })
}
