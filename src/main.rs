//! # RC Car Bridge
//!
//! Drive an RC car from a Linux gamepad.
//!
//! Reads the gamepad through evdev, computes the control representation on
//! every input and applies it to the steering servo, throttle servo and
//! relays.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

use rc_car_bridge::config::{Config, LoggingConfig, OutputBackend};
use rc_car_bridge::controller::{EngineEvent, InputEngine};
use rc_car_bridge::device::{EvdevConnector, ReconnectSupervisor};
use rc_car_bridge::output::{build_actuators, ActuatorObserver, OutputDriver};
use rc_car_bridge::telemetry::JsonlRecorder;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "rc-car-bridge", version, about)]
struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device path, e.g. /dev/input/event0 (overrides the config file)
    #[arg(short, long)]
    device: Option<String>,

    /// Log actuator commands instead of driving hardware
    #[arg(long)]
    dry_run: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(device) = &cli.device {
        config.device.path = device.clone();
    }
    if cli.dry_run {
        config.output.backend = OutputBackend::DryRun;
    }

    config.validate()?;
    Ok(config)
}

/// Installs the stderr subscriber and, when configured, a daily rolling file.
///
/// The returned guard must be held until exit so buffered lines are written.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", config.level))?;
    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into());

    let (file_layer, guard) = if config.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.file_dir, "rc-car-bridge.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Main entry point for RC Car Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and apply command line overrides
///    - Set up logging
///    - Drive the actuators to the safe state
///
/// 2. **Main Loop**
///    - Acquire the gamepad, retrying every `reconnect_interval_ms`
///    - Apply a fresh representation on every input
///
/// 3. **Graceful Shutdown** (Ctrl+C or SIGTERM)
///    - Release the input device
///    - Return the actuators to the safe state
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = init_logging(&config.logging)?;

    info!("RC Car Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut engine = InputEngine::new(config.bindings.accessory_bindings()?);

    let actuators = build_actuators(&config.output)?;
    let driver = OutputDriver::new(actuators)?;
    engine.subscribe(ActuatorObserver::new(driver, &config.output));
    info!(backend = ?config.output.backend, "Actuators ready");

    if config.telemetry.enabled {
        engine.subscribe(JsonlRecorder::new(&config.telemetry)?);
        info!(dir = %config.telemetry.log_dir, "Telemetry recording enabled");
    }

    let published = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&published);
    engine.subscribe_fn(move |event: &EngineEvent<'_>| {
        if let EngineEvent::Representation(_) = event {
            counter.set(counter.get() + 1);
        }
    });

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    };

    let mut supervisor = ReconnectSupervisor::new(
        EvdevConnector::new(&config.device.path),
        engine,
        Duration::from_millis(config.device.reconnect_interval_ms),
    );

    info!("Press Ctrl+C to exit");
    supervisor.run(shutdown).await;

    // Dropping the engine releases the actuators
    drop(supervisor);
    info!("Total representations published: {}", published.get());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides_device() {
        let cli = Cli::try_parse_from(["rc-car-bridge", "--device", "/dev/input/event3"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.device.path, "/dev/input/event3");
    }

    #[test]
    fn test_cli_defaults_without_config() {
        let cli = Cli::try_parse_from(["rc-car-bridge"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_dry_run_overrides_backend() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[output]\nbackend = \"rpi\"\n").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::try_parse_from(["rc-car-bridge", "-c", path.as_str(), "--dry-run"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.output.backend, OutputBackend::DryRun);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = Cli::try_parse_from(["rc-car-bridge", "-c", "/nonexistent/config.toml"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
