//! # evdev Gamepad Source
//!
//! Opens a Linux input device, reads its capabilities and streams its events.
//!
//! ## Device Selection
//!
//! With a configured path (e.g. `/dev/input/event0`) that device is opened
//! directly. Otherwise `/dev/input/event*` is scanned in sorted order and the
//! first device reporting `BTN_SOUTH` together with absolute axes is used.
//!
//! ## Event Translation
//!
//! Kernel codes are translated to canonical names (`ABS_RX`, `BTN_Y`, ...).
//! Sync, misc and any code without a canonical name are dropped here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use evdev::{Device, EventStream, InputEvent, InputEventKind, Key};
use tracing::{debug, info, trace};

use crate::controller::axis_store::AxisReading;
use crate::controller::codes::{axis_code_name, key_code_name};
use crate::error::{RcBridgeError, Result};

use super::source_trait::{DeviceCapabilities, DeviceConnector, DeviceId, InputSource, RawEvent};

const INPUT_DIR: &str = "/dev/input";

/// Opens evdev gamepads.
#[derive(Debug, Clone, Default)]
pub struct EvdevConnector {
    device_path: Option<PathBuf>,
}

impl EvdevConnector {
    /// Creates a connector for `device_path`; an empty path auto-detects.
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_car_bridge::device::EvdevConnector;
    ///
    /// let fixed = EvdevConnector::new("/dev/input/event0");
    /// assert!(fixed.device_path().is_some());
    ///
    /// let auto = EvdevConnector::new("");
    /// assert!(auto.device_path().is_none());
    /// ```
    pub fn new(device_path: &str) -> Self {
        let device_path = (!device_path.is_empty()).then(|| PathBuf::from(device_path));
        Self { device_path }
    }

    pub fn device_path(&self) -> Option<&Path> {
        self.device_path.as_deref()
    }

    fn open_device(&self) -> Result<(PathBuf, Device)> {
        match &self.device_path {
            Some(path) => {
                let device = Device::open(path).map_err(|e| {
                    RcBridgeError::DeviceUnavailable(format!("Failed to open {}: {}", path.display(), e))
                })?;
                Ok((path.clone(), device))
            }
            None => find_gamepad(),
        }
    }
}

#[async_trait]
impl DeviceConnector for EvdevConnector {
    type Source = EvdevSource;

    async fn connect(&mut self) -> Result<EvdevSource> {
        let (path, device) = self.open_device()?;
        let capabilities = read_capabilities(&path, &device)?;

        let stream = device.into_event_stream().map_err(|e| {
            RcBridgeError::DeviceUnavailable(format!(
                "Failed to stream events from {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(
            device = %capabilities.name,
            path = %path.display(),
            vendor = format_args!("0x{:04x}", capabilities.id.vendor),
            product = format_args!("0x{:04x}", capabilities.id.product),
            "Opened input device"
        );

        Ok(EvdevSource {
            capabilities,
            stream: Some(stream),
        })
    }
}

/// Scans `/dev/input` for the first device that looks like a gamepad.
fn find_gamepad() -> Result<(PathBuf, Device)> {
    let input_dir = Path::new(INPUT_DIR);

    let mut entries: Vec<_> = std::fs::read_dir(input_dir)
        .map_err(|e| RcBridgeError::DeviceUnavailable(format!("Failed to read {}: {}", INPUT_DIR, e)))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("event"))
        })
        .collect();

    // Deterministic choice when several controllers are connected
    entries.sort();

    for path in entries {
        match Device::open(&path) {
            Ok(device) if is_gamepad(&device) => {
                debug!(path = %path.display(), "Found gamepad");
                return Ok((path, device));
            }
            Ok(_) => trace!(path = %path.display(), "Not a gamepad"),
            Err(e) => debug!(path = %path.display(), error = %e, "Could not open input device"),
        }
    }

    Err(RcBridgeError::DeviceUnavailable(format!(
        "No gamepad found in {}",
        INPUT_DIR
    )))
}

fn is_gamepad(device: &Device) -> bool {
    let has_face_buttons = device
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::BTN_SOUTH));
    let has_axes = device
        .supported_absolute_axes()
        .is_some_and(|axes| axes.iter().next().is_some());
    has_face_buttons && has_axes
}

/// Queries name, identifiers, axis ranges and buttons from an open device.
fn read_capabilities(path: &Path, device: &Device) -> Result<DeviceCapabilities> {
    let abs_state = device.get_abs_state().map_err(|e| {
        RcBridgeError::DeviceUnavailable(format!(
            "Failed to query axes of {}: {}",
            path.display(),
            e
        ))
    })?;

    let axes = device
        .supported_absolute_axes()
        .into_iter()
        .flat_map(|axes| axes.iter())
        .filter_map(|axis| {
            let code = axis_code_name(axis)?;
            let info = abs_state.get(usize::from(axis.0))?;
            let reading = AxisReading {
                value: info.value,
                min: info.minimum,
                max: info.maximum,
                fuzz: info.fuzz,
                flat: info.flat,
            };
            Some((code.to_string(), reading))
        })
        .collect();

    let buttons = device
        .supported_keys()
        .into_iter()
        .flat_map(|keys| keys.iter())
        .filter_map(key_code_name)
        .map(str::to_string)
        .collect();

    let id = device.input_id();

    Ok(DeviceCapabilities {
        name: device.name().unwrap_or("Unknown device").to_string(),
        path: path.display().to_string(),
        id: DeviceId {
            bus: id.bus_type().0,
            vendor: id.vendor(),
            product: id.product(),
            version: id.version(),
        },
        axes,
        buttons,
    })
}

/// Translates a kernel event to a raw event with a canonical code.
///
/// Returns `None` for sync events and unnamed codes.
pub fn translate_event(event: &InputEvent) -> Option<RawEvent> {
    match event.kind() {
        InputEventKind::AbsAxis(axis) => {
            axis_code_name(axis).map(|code| RawEvent::axis(code, event.value()))
        }
        InputEventKind::Key(key) => {
            key_code_name(key).map(|code| RawEvent::button(code, event.value()))
        }
        _ => None,
    }
}

/// A bound evdev device.
pub struct EvdevSource {
    capabilities: DeviceCapabilities,
    stream: Option<EventStream>,
}

impl std::fmt::Debug for EvdevSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevSource")
            .field("path", &self.capabilities.path)
            .field("open", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InputSource for EvdevSource {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    async fn next_event(&mut self) -> Result<RawEvent> {
        let path = &self.capabilities.path;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| RcBridgeError::DeviceUnavailable(format!("{} is closed", path)))?;

        loop {
            let event = stream.next_event().await.map_err(|e| {
                RcBridgeError::DeviceUnavailable(format!("Failed to read {}: {}", path, e))
            })?;

            if let Some(raw) = translate_event(&event) {
                trace!(code = %raw.code, value = raw.value, "Raw event");
                return Ok(raw);
            }
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(path = %self.capabilities.path, "Closed input device");
        }
    }
}
