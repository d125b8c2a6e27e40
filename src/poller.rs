//! # Poller
//!
//! Drives the poll cycle: read a sample, append it, apply retention, sleep.
//!
//! The loop is cancellable. A `watch` channel carries the stop signal; it is
//! checked before every cycle and interrupts the sleep between cycles. A
//! failed cycle is logged and counted, and polling carries on.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::telemetry::{CsvLog, Sample, TelemetrySource};

/// Totals reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Cycles attempted
    pub cycles: u64,
    /// Samples appended to the log, including those of cycles that later
    /// failed in retention
    pub logged: u64,
    /// Cycles that ended in an error at any step
    pub failures: u64,
}

/// Periodic position logger
pub struct Poller<S> {
    source: S,
    log: CsvLog,
    interval: Duration,
}

impl<S: TelemetrySource> Poller<S> {
    pub fn new(source: S, log: CsvLog, interval: Duration) -> Self {
        Self { source, log, interval }
    }

    pub fn log(&self) -> &CsvLog {
        &self.log
    }

    /// Run a single read, append and retention pass
    ///
    /// # Errors
    ///
    /// Propagates the first failure of the cycle; nothing is appended when
    /// the read fails.
    pub fn poll_once(&mut self) -> Result<Sample> {
        let sample = self.append_next()?;
        self.retain()?;
        Ok(sample)
    }

    fn append_next(&mut self) -> Result<Sample> {
        let sample = self.source.read_sample()?;
        self.log.append(&sample)?;
        Ok(sample)
    }

    fn retain(&self) -> Result<()> {
        let evicted = self.log.enforce_retention()?;
        if evicted > 0 {
            debug!("Retention evicted {} row(s)", evicted);
        }
        Ok(())
    }

    fn run_cycle(&mut self, stats: &mut PollStats) -> Result<()> {
        self.append_next()?;
        stats.logged += 1;
        self.retain()
    }

    /// Poll until `shutdown` turns `true` or its sender is dropped
    ///
    /// The log is initialized once before the first cycle; failing to do so
    /// is the only error returned. Errors inside a cycle are logged at `warn`
    /// and counted in the returned [`PollStats`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use position_logger::poller::Poller;
    /// use position_logger::telemetry::{CsvLog, FileSource};
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> anyhow::Result<()> {
    ///     let (_stop, shutdown) = tokio::sync::watch::channel(false);
    ///     let poller = Poller::new(
    ///         FileSource::new("./streaming"),
    ///         CsvLog::new("./logs/data_log.csv").with_max_rows(100),
    ///         Duration::from_secs(60),
    ///     );
    ///     let stats = poller.run_forever(shutdown).await?;
    ///     println!("{} cycles", stats.cycles);
    ///     Ok(())
    /// }
    /// ```
    pub async fn run_forever(mut self, mut shutdown: watch::Receiver<bool>) -> Result<PollStats> {
        self.log.ensure_initialized()?;

        info!(
            "Polling every {}s into {} (retention: {})",
            self.interval.as_secs(),
            self.log.path().display(),
            self.log
                .max_rows()
                .map_or_else(|| "unbounded".to_string(), |n| format!("{} rows", n))
        );

        let mut stats = PollStats::default();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            stats.cycles += 1;
            if let Err(e) = self.run_cycle(&mut stats) {
                stats.failures += 1;
                warn!("Poll cycle {} failed: {}", stats.cycles, e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped, stopping");
                        break;
                    }
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PositionLoggerError;
    use crate::telemetry::source::MockTelemetrySource;
    use crate::telemetry::FileSource;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn numbered_source() -> MockTelemetrySource {
        let mut source = MockTelemetrySource::new();
        let mut n = 0;
        source.expect_read_sample().returning(move || {
            n += 1;
            Ok(Sample::new(format!("t{}", n), format!("{}", n), "0", "500"))
        });
        source
    }

    #[test]
    fn test_poll_once_reads_files_into_log() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lat.txt"), "47.6062").unwrap();
        fs::write(dir.path().join("lon.txt"), "-122.3321").unwrap();
        fs::write(dir.path().join("altitude.txt"), "500").unwrap();

        let log = CsvLog::new(dir.path().join("data_log.csv"));
        log.ensure_initialized().unwrap();

        let mut poller = Poller::new(FileSource::new(dir.path()), log, INTERVAL);
        let sample = poller.poll_once().unwrap();

        let contents = fs::read_to_string(poller.log().path()).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert_eq!(row, format!("{},47.6062,-122.3321,500", sample.timestamp));
    }

    #[test]
    fn test_poll_once_failed_read_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("data_log.csv"));
        log.ensure_initialized().unwrap();

        let mut source = MockTelemetrySource::new();
        source.expect_read_sample().times(1).returning(|| {
            Err(PositionLoggerError::SourceUnavailable {
                path: PathBuf::from("lat.txt"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });

        let mut poller = Poller::new(source, log, INTERVAL);
        assert!(poller.poll_once().is_err());
        assert!(poller.log().read_all().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_one_cycle_per_interval_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("data_log.csv"));
        let poller = Poller::new(numbered_source(), log.clone(), INTERVAL);
        let (stop, shutdown) = watch::channel(false);

        let (result, _) = tokio::join!(poller.run_forever(shutdown), async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            stop.send(true).unwrap();
        });

        let stats = assert_ok!(result);
        assert_eq!(stats, PollStats { cycles: 3, logged: 3, failures: 0 });

        let lats: Vec<String> = log.read_all().unwrap().into_iter().map(|s| s.latitude).collect();
        assert_eq!(lats, vec!["1", "2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_is_counted_and_polling_continues() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("data_log.csv"));

        let mut source = MockTelemetrySource::new();
        let mut calls = 0;
        source.expect_read_sample().returning(move || {
            calls += 1;
            if calls == 2 {
                Err(PositionLoggerError::MalformedSample {
                    field: "altitude",
                    value: String::new(),
                })
            } else {
                Ok(Sample::new(format!("t{}", calls), "47.6062", "-122.3321", "500"))
            }
        });

        let poller = Poller::new(source, log.clone(), INTERVAL);
        let (stop, shutdown) = watch::channel(false);

        let (result, _) = tokio::join!(poller.run_forever(shutdown), async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            stop.send(true).unwrap();
        });

        let stats = assert_ok!(result);
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.logged, 2);

        let stamps: Vec<String> = log.read_all().unwrap().into_iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec!["t1", "t3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_applied_each_cycle() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("data_log.csv")).with_max_rows(100);
        let poller = Poller::new(numbered_source(), log.clone(), Duration::from_secs(1));
        let (stop, shutdown) = watch::channel(false);

        // Cycles run at t = 0..=100, i.e. 101 appends
        let (result, _) = tokio::join!(poller.run_forever(shutdown), async move {
            tokio::time::sleep(Duration::from_millis(100_500)).await;
            stop.send(true).unwrap();
        });

        assert_eq!(assert_ok!(result).cycles, 101);

        let rows = log.read_all().unwrap();
        assert_eq!(rows.len(), 100);
        assert_eq!(rows[0].latitude, "2");
        assert_eq!(rows[99].latitude, "101");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retention_failure_still_counts_logged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data_log.csv");
        fs::write(&path, "Timestamp,Latitude,Longitude,Altitude\r\na,b\r\n").unwrap();

        let log = CsvLog::new(&path).with_max_rows(1);
        let poller = Poller::new(numbered_source(), log, INTERVAL);
        let (stop, shutdown) = watch::channel(false);

        let (result, _) = tokio::join!(poller.run_forever(shutdown), async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            stop.send(true).unwrap();
        });

        let stats = assert_ok!(result);
        assert_eq!(stats, PollStats { cycles: 3, logged: 3, failures: 3 });

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5, "header, bad row and 3 appended rows");
    }

    #[tokio::test]
    async fn test_stop_before_first_cycle() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("data_log.csv"));

        let mut source = MockTelemetrySource::new();
        source.expect_read_sample().never();

        let (stop, shutdown) = watch::channel(false);
        stop.send(true).unwrap();

        let stats = Poller::new(source, log.clone(), INTERVAL)
            .run_forever(shutdown)
            .await
            .unwrap();

        assert_eq!(stats, PollStats::default());
        assert!(log.path().exists(), "log should be initialized even without cycles");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_loop() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("data_log.csv"));
        let poller = Poller::new(numbered_source(), log, INTERVAL);
        let (stop, shutdown) = watch::channel(false);
        drop(stop);

        let stats = poller.run_forever(shutdown).await.unwrap();
        assert_eq!(stats.cycles, 1);
    }

    #[tokio::test]
    async fn test_uninitializable_log_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let mut source = MockTelemetrySource::new();
        source.expect_read_sample().never();

        let (_stop, shutdown) = watch::channel(false);
        let result = Poller::new(source, CsvLog::new(blocker.join("data_log.csv")), INTERVAL)
            .run_forever(shutdown)
            .await;

        assert!(matches!(result, Err(PositionLoggerError::SinkUnavailable { .. })));
    }
}
