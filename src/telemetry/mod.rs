//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Recording published representations, device announcements and errors
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

pub mod recorder;

pub use recorder::JsonlRecorder;
