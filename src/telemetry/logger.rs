//! # Position Log
//!
//! CSV log of position samples with an optional retention cap.
//!
//! Rows are written with CRLF terminators and minimal quoting, so the file
//! opens cleanly in spreadsheet tools. When a cap is configured the log keeps
//! only the most recent rows; older rows are evicted first.
//!
//! ## Usage
//!
//! ```no_run
//! use position_logger::telemetry::{CsvLog, Sample};
//!
//! let log = CsvLog::new("logs/data_log.csv").with_max_rows(100);
//! log.ensure_initialized()?;
//! log.append(&Sample::new("2024-01-01 12:00:00", "47.6062", "-122.3321", "500"))?;
//! log.enforce_retention()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::LogConfig;
use crate::error::{PositionLoggerError, Result};
use crate::telemetry::types::{Sample, HEADER};

/// Position log on disk
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
    max_rows: Option<usize>,
}

impl CsvLog {
    /// Unbounded log at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            max_rows: None,
        }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            max_rows: config.max_rows,
        }
    }

    /// Keep at most `max_rows` data rows
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    /// Create the log with its header if it does not exist yet.
    ///
    /// Returns `true` when the header was written.
    pub fn ensure_initialized(&self) -> Result<bool> {
        ensure_log_initialized(&self.path, &HEADER)
    }

    pub fn append(&self, sample: &Sample) -> Result<()> {
        append_sample(&self.path, sample)
    }

    /// Apply the retention cap, if any. Returns the number of evicted rows.
    pub fn enforce_retention(&self) -> Result<usize> {
        match self.max_rows {
            Some(max_rows) => enforce_retention(&self.path, &HEADER, max_rows),
            None => Ok(0),
        }
    }

    pub fn read_all(&self) -> Result<Vec<Sample>> {
        read_log(&self.path)
    }
}

/// Create `path` containing only the header row if it does not already exist
///
/// An existing zero-length file is treated as missing. Parent directories
/// are created as needed.
///
/// # Returns
///
/// * `Result<bool>` - `true` if the header was written, `false` if the log
///   was already initialized
///
/// # Errors
///
/// Returns [`PositionLoggerError::SinkUnavailable`] if the file cannot be created
pub fn ensure_log_initialized<P: AsRef<Path>>(path: P, header: &[&str]) -> Result<bool> {
    let path = path.as_ref();

    match fs::metadata(path) {
        Ok(meta) if !meta.is_file() => {
            return Err(sink(path, io::Error::new(io::ErrorKind::Other, "not a regular file")));
        }
        Ok(meta) if meta.len() > 0 => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(sink(path, e)),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| sink(path, e))?;
    }

    let file = File::create(path).map_err(|e| sink(path, e))?;
    let mut writer = writer_for(file);
    writer
        .write_record(header)
        .map_err(|e| sink(path, e.into()))?;
    writer.flush().map_err(|e| sink(path, e))?;

    info!("Created position log at {}", path.display());
    Ok(true)
}

/// Append one sample row to the log at `path`
///
/// A log that is missing or empty (deleted or rotated away while polling)
/// gets the header row before the sample.
///
/// # Errors
///
/// Returns [`PositionLoggerError::SinkUnavailable`] if the file cannot be
/// opened or written
pub fn append_sample<P: AsRef<Path>>(path: P, sample: &Sample) -> Result<()> {
    let path = path.as_ref();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| sink(path, e))?;
    let needs_header = file.metadata().map_err(|e| sink(path, e))?.len() == 0;

    let mut writer = writer_for(file);
    if needs_header {
        writer
            .write_record(HEADER)
            .map_err(|e| sink(path, e.into()))?;
        info!("Restored header of position log at {}", path.display());
    }
    writer
        .serialize(sample)
        .map_err(|e| sink(path, e.into()))?;
    writer.flush().map_err(|e| sink(path, e))?;

    debug!(
        "Logged {} lat={} lon={} alt={}",
        sample.timestamp, sample.latitude, sample.longitude, sample.altitude
    );
    Ok(())
}

/// Trim the log at `path` to its most recent `max_rows` data rows
///
/// Does nothing while the log holds `max_rows` rows or fewer. Otherwise the
/// header and the newest rows are written to a sibling temporary file which
/// then replaces the log.
///
/// # Returns
///
/// * `Result<usize>` - Number of rows evicted
///
/// # Errors
///
/// - [`PositionLoggerError::MalformedExisting`] if a row cannot be parsed
/// - [`PositionLoggerError::SinkUnavailable`] if the log cannot be read or replaced
pub fn enforce_retention<P: AsRef<Path>>(path: P, header: &[&str], max_rows: usize) -> Result<usize> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| sink(path, e))?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record.map_err(|e| malformed(path, e))?);
    }

    if rows.len() <= max_rows {
        return Ok(0);
    }

    let evicted = rows.len() - max_rows;
    let tmp_path = temp_path_for(path);

    let result = (|| -> io::Result<()> {
        let mut writer = writer_for(File::create(&tmp_path)?);
        writer.write_record(header)?;
        for row in &rows[evicted..] {
            writer.write_record(row)?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(sink(path, e));
    }

    debug!("Evicted {} row(s) from {}, kept {}", evicted, path.display(), max_rows);
    Ok(evicted)
}

/// Read every sample row from the log at `path`
///
/// # Errors
///
/// - [`PositionLoggerError::SinkUnavailable`] if the file cannot be opened
/// - [`PositionLoggerError::MalformedExisting`] if a row cannot be parsed
pub fn read_log<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| sink(path, e))?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

    let samples = reader
        .deserialize()
        .map(|row| row.map_err(|e| malformed(path, e)))
        .collect::<Result<Vec<Sample>>>()?;
    Ok(samples)
}

fn writer_for(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(file)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn sink(path: &Path, source: io::Error) -> PositionLoggerError {
    PositionLoggerError::SinkUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

fn malformed(path: &Path, source: csv::Error) -> PositionLoggerError {
    PositionLoggerError::MalformedExisting {
        path: path.to_path_buf(),
        source,
    }
}
