//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key has a default, so an empty file is a valid
//! configuration equal to [`Config::default`].

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::controller::codes::Button;
use crate::controller::toggle::AccessoryBindings;
use crate::error::{RcBridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub bindings: BindingsConfig,
    pub output: OutputConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Input device configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Empty means auto-detect.
    #[serde(default)]
    pub path: String,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Button bindings (normalized names, e.g. "y" or "west")
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BindingsConfig {
    #[serde(default = "default_front_light_bar")]
    pub front_light_bar: String,
}

/// Actuator backend selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputBackend {
    /// Log commands only
    #[default]
    DryRun,
    /// Raspberry Pi GPIO relays and PCA9685 servos (needs the `rpi` feature)
    Rpi,
}

/// Actuator configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub backend: OutputBackend,

    #[serde(default = "default_failsafe_on_disconnect")]
    pub failsafe_on_disconnect: bool,

    #[serde(default = "default_throttle_enable_pin")]
    pub throttle_enable_pin: u8,

    #[serde(default = "default_throttle_direction_pin")]
    pub throttle_direction_pin: u8,

    #[serde(default = "default_light_bar_pin")]
    pub light_bar_pin: u8,

    #[serde(default = "default_pca9685_address")]
    pub pca9685_address: u16,

    #[serde(default = "default_throttle_servo_channel")]
    pub throttle_servo_channel: u8,

    #[serde(default = "default_steering_servo_channel")]
    pub steering_servo_channel: u8,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty disables the rolling log file.
    #[serde(default)]
    pub file_dir: String,
}

// Default value functions
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_front_light_bar() -> String { "y".to_string() }

fn default_failsafe_on_disconnect() -> bool { true }
fn default_throttle_enable_pin() -> u8 { 20 }
fn default_throttle_direction_pin() -> u8 { 26 }
fn default_light_bar_pin() -> u8 { 21 }
fn default_pca9685_address() -> u16 { 0x40 }
fn default_throttle_servo_channel() -> u8 { 0 }
fn default_steering_servo_channel() -> u8 { 3 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// PCA9685 has 16 PWM outputs
const PCA9685_CHANNELS: u8 = 16;

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            front_light_bar: default_front_light_bar(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::default(),
            failsafe_on_disconnect: default_failsafe_on_disconnect(),
            throttle_enable_pin: default_throttle_enable_pin(),
            throttle_direction_pin: default_throttle_direction_pin(),
            light_bar_pin: default_light_bar_pin(),
            pca9685_address: default_pca9685_address(),
            throttle_servo_channel: default_throttle_servo_channel(),
            steering_servo_channel: default_steering_servo_channel(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> RcBridgeError {
    RcBridgeError::Config(toml::de::Error::custom(message))
}

impl TelemetryConfig {
    /// Checks the recorder settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if a limit is 0 or the directory is missing.
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

impl BindingsConfig {
    /// Resolves the configured button names.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if a name is not a recognized button.
    pub fn accessory_bindings(&self) -> Result<AccessoryBindings> {
        let front_light_bar = Button::from_name(&self.front_light_bar).ok_or_else(|| {
            invalid(format!(
                "front_light_bar binding '{}' is not a recognized button",
                self.front_light_bar
            ))
        })?;
        Ok(AccessoryBindings { front_light_bar })
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_car_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `Config` error if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        if self.device.reconnect_interval_ms == 0 || self.device.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        self.bindings.accessory_bindings()?;

        let output = &self.output;
        for (name, channel) in [
            ("throttle_servo_channel", output.throttle_servo_channel),
            ("steering_servo_channel", output.steering_servo_channel),
        ] {
            if channel >= PCA9685_CHANNELS {
                return Err(invalid(format!("{} {} is out of bounds (must be 0-15)", name, channel)));
            }
        }

        if output.throttle_servo_channel == output.steering_servo_channel {
            return Err(invalid("throttle and steering servos must use different channels"));
        }

        let pins = [
            output.throttle_enable_pin,
            output.throttle_direction_pin,
            output.light_bar_pin,
        ];
        if pins[0] == pins[1] || pins[0] == pins[2] || pins[1] == pins[2] {
            return Err(invalid("relay pins must be distinct"));
        }

        if output.pca9685_address > 0x7f {
            return Err(invalid("pca9685_address must be a 7-bit I2C address"));
        }

        self.telemetry.validate()?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
