//! # Error Types
//!
//! Custom error types for Position Logger using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Position Logger
#[derive(Debug, Error)]
pub enum PositionLoggerError {
    /// A telemetry file is missing or unreadable
    #[error("telemetry source unavailable at {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The position log cannot be created or written
    #[error("position log unavailable at {}: {source}", .path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The existing position log could not be parsed
    #[error("malformed position log at {}: {source}", .path.display())]
    MalformedExisting {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A telemetry value was rejected by numeric validation
    #[error("malformed {field} value: {value:?}")]
    MalformedSample { field: &'static str, value: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Position Logger
pub type Result<T> = std::result::Result<T, PositionLoggerError>;
