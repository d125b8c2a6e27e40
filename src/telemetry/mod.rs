//! # Telemetry Module
//!
//! Reads position telemetry from the flight simulator and keeps the CSV log.
//!
//! This module handles:
//! - Reading latitude, longitude and altitude text files
//! - Stamping each reading with local time
//! - Appending rows to the CSV position log
//! - Bounding the log to the most recent N rows

pub mod logger;
pub mod source;
pub mod types;

pub use logger::CsvLog;
pub use source::{FileSource, TelemetrySource};
pub use types::{Sample, HEADER};
