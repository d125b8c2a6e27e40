//! # Position Logger Library
//!
//! Polls flight-simulator telemetry files and records aircraft position to a CSV log.
//!
//! An external data source keeps `lat.txt`, `lon.txt` and `altitude.txt` up to date.
//! This library reads them on a fixed interval, appends a timestamped row to the
//! log and optionally bounds the log to the most recent rows.

pub mod config;
pub mod error;
pub mod poller;
pub mod telemetry;
