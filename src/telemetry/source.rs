//! # Telemetry Source
//!
//! Reads the latitude, longitude and altitude files that the flight simulator
//! overwrites between polls.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::config::SourceConfig;
use crate::error::{PositionLoggerError, Result};
use crate::telemetry::types::Sample;

/// Default latitude file name
pub const LAT_FILE: &str = "lat.txt";
/// Default longitude file name
pub const LON_FILE: &str = "lon.txt";
/// Default altitude file name
pub const ALTITUDE_FILE: &str = "altitude.txt";

/// Anything that can produce a position sample on demand
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySource {
    /// Take one reading, stamped with the current local time
    fn read_sample(&mut self) -> Result<Sample>;
}

/// Reads samples from three text files in a directory
#[derive(Debug, Clone)]
pub struct FileSource {
    lat_path: PathBuf,
    lon_path: PathBuf,
    altitude_path: PathBuf,
    trim_values: bool,
    validate_numeric: bool,
}

impl FileSource {
    /// Source using the default file names in `dir`, returning raw contents
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            lat_path: dir.join(LAT_FILE),
            lon_path: dir.join(LON_FILE),
            altitude_path: dir.join(ALTITUDE_FILE),
            trim_values: false,
            validate_numeric: false,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        let [lat_path, lon_path, altitude_path] = config.file_paths();
        Self {
            lat_path,
            lon_path,
            altitude_path,
            trim_values: config.trim_values,
            validate_numeric: config.validate_numeric,
        }
    }

    /// Strip surrounding whitespace, such as a trailing newline, from values
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        self.trim_values = true;
        self
    }

    /// Reject values that are not finite numbers
    #[must_use]
    pub fn validating(mut self) -> Self {
        self.validate_numeric = true;
        self
    }

    fn read_field(&self, field: &'static str, path: &Path) -> Result<String> {
        let contents = fs::read_to_string(path).map_err(|source| {
            PositionLoggerError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let value = if self.trim_values {
            contents.trim().to_string()
        } else {
            contents
        };

        if self.validate_numeric {
            validate_numeric(field, &value)?;
        }

        trace!("Read {} = {:?} from {}", field, value, path.display());
        Ok(value)
    }
}

impl TelemetrySource for FileSource {
    fn read_sample(&mut self) -> Result<Sample> {
        let now = Local::now();
        let latitude = self.read_field("latitude", &self.lat_path)?;
        let longitude = self.read_field("longitude", &self.lon_path)?;
        let altitude = self.read_field("altitude", &self.altitude_path)?;
        Ok(Sample::at(now, latitude, longitude, altitude))
    }
}

/// Read one sample from `lat.txt`, `lon.txt` and `altitude.txt` in `source_dir`
///
/// # Errors
///
/// Returns [`PositionLoggerError::SourceUnavailable`] naming the first file
/// that is missing or unreadable.
///
/// # Examples
///
/// ```no_run
/// use position_logger::telemetry::source::read_sample;
///
/// let sample = read_sample("./streaming")?;
/// println!("{} {} {}", sample.latitude, sample.longitude, sample.altitude);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn read_sample<P: AsRef<Path>>(source_dir: P) -> Result<Sample> {
    FileSource::new(source_dir).read_sample()
}

fn validate_numeric(field: &'static str, value: &str) -> Result<()> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(()),
        _ => Err(PositionLoggerError::MalformedSample {
            field,
            value: value.to_string(),
        }),
    }
}
