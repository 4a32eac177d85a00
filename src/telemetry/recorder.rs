//! JSONL recorder for engine events.
//!
//! Each line is one object:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123+00:00","event":"representation","data":{...}}
//! ```
//!
//! Files are named `telemetry_<YYYYmmdd_HHMMSS>_<seq>.jsonl`, so sorting by
//! name sorts by age.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::TelemetryConfig;
use crate::controller::publisher::{EngineEvent, Observer};
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    event: &'a str,
    data: Value,
}

/// Observer writing events to rotating JSONL files.
pub struct JsonlRecorder {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    sequence: u32,
}

impl JsonlRecorder {
    /// Creates the log directory if needed. No file is opened until the first
    /// record.
    ///
    /// # Errors
    ///
    /// - `Config`: a file or record limit is 0
    /// - `Io`: the directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        config.validate()?;

        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            writer: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    /// Appends one event. Button edges are not recorded.
    ///
    /// # Errors
    ///
    /// Returns `Json` or `Io` error if the record cannot be written.
    pub fn record(&mut self, event: &EngineEvent<'_>) -> Result<()> {
        let data = match event {
            EngineEvent::Representation(representation) => serde_json::to_value(representation)?,
            EngineEvent::Device(capabilities) => serde_json::to_value(capabilities)?,
            EngineEvent::Error(error) => serde_json::json!({ "message": error.to_string() }),
            EngineEvent::Edge(_) => return Ok(()),
        };

        let record = Record {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            event: event.name(),
            data,
        };

        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &record)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Flushes buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.sequence,
            FILE_EXTENSION
        );
        self.sequence = self.sequence.wrapping_add(1);

        let path = self.dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Opened telemetry file");

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;

        self.prune()
    }

    /// Removes the oldest telemetry files beyond `max_files_to_keep`.
    fn prune(&self) -> Result<()> {
        let mut files = telemetry_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            debug!(path = %path.display(), "Removing old telemetry file");
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn telemetry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_telemetry = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(FILE_PREFIX))
            && path.extension().is_some_and(|ext| ext == FILE_EXTENSION);
        if is_telemetry {
            files.push(path);
        }
    }
    Ok(files)
}

impl Observer for JsonlRecorder {
    fn notify(&mut self, event: &EngineEvent<'_>) {
        if let Err(e) = self.record(event) {
            warn!(error = %e, "Failed to write telemetry record");
        }
    }
}

impl Drop for JsonlRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "Failed to flush telemetry");
        }
    }
}

impl std::fmt::Debug for JsonlRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlRecorder")
            .field("dir", &self.dir)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}
