//! Scan orchestration.
//!
//! One run reads the settings, gates the checks, ingests indicators once,
//! runs the enabled checks concurrently and assembles a [`ScanReport`].
//! Match lists are owned by the run; nothing accumulates across runs.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::settings::{ScanSettings, SettingsProvider};
use crate::core::types::{CheckKind, CheckOutcome, IndicatorKind, ScanReport, ScanState};
use crate::detection::{IndicatorIngester, IndicatorSet};
use crate::scanner::file::HashScanner;
use crate::scanner::network::{ConnectionMatcher, ConnectionTable, SystemConnectionTable};
use crate::scanner::process::{ProcessMatcher, ProcessTable, SystemProcessTable};
use crate::scanner::results::ReportSink;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long `Completed` is reported before the engine reads as idle again.
pub const COMPLETED_HOLD: Duration = Duration::from_secs(2);

/// Runs scan passes and tracks their lifecycle.
pub struct ScanEngine {
    settings: Arc<dyn SettingsProvider>,
    ingester: IndicatorIngester,
    hash_scanner: HashScanner,
    connections: Arc<ConnectionMatcher>,
    processes: Arc<ProcessMatcher>,
    state: Mutex<(ScanState, Instant)>,
    completed_hold: Duration,
    running: AtomicBool,
    last_timestamp: AtomicI64,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl ScanEngine {
    /// Create an engine using the operating system's connection and process tables.
    pub fn new(settings: Arc<dyn SettingsProvider>, ingester: IndicatorIngester) -> Self {
        Self {
            settings,
            ingester,
            hash_scanner: HashScanner::default(),
            connections: Arc::new(ConnectionMatcher::new(Arc::new(SystemConnectionTable::new()))),
            processes: Arc::new(ProcessMatcher::new(Arc::new(SystemProcessTable::new()))),
            state: Mutex::new((ScanState::Idle, Instant::now())),
            completed_hold: COMPLETED_HOLD,
            running: AtomicBool::new(false),
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// Create an engine from application configuration.
    pub fn from_config(config: &Config, settings: Arc<dyn SettingsProvider>) -> Result<Self> {
        let ingester = IndicatorIngester::from_config(config)?;
        Ok(Self::new(settings, ingester).with_hash_workers(config.scan.hash_workers))
    }

    /// Set the hashing worker pool size.
    pub fn with_hash_workers(mut self, workers: usize) -> Self {
        self.hash_scanner = HashScanner::new(workers);
        self
    }

    /// Use a different connection table.
    pub fn with_connection_table(mut self, table: Arc<dyn ConnectionTable>) -> Self {
        self.connections = Arc::new(ConnectionMatcher::new(table));
        self
    }

    /// Use a different process table.
    pub fn with_process_table(mut self, table: Arc<dyn ProcessTable>) -> Self {
        self.processes = Arc::new(ProcessMatcher::new(table));
        self
    }

    /// Set how long a finished run reports `Completed`.
    pub fn with_completed_hold(mut self, hold: Duration) -> Self {
        self.completed_hold = hold;
        self
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ScanState {
        let (state, since) = match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        if state == ScanState::Completed && since.elapsed() >= self.completed_hold {
            ScanState::Idle
        } else {
            state
        }
    }

    fn set_state(&self, state: ScanState) {
        log::debug!("Scan state: {}", state);
        let entry = (state, Instant::now());
        match self.state.lock() {
            Ok(mut guard) => *guard = entry,
            Err(poisoned) => *poisoned.into_inner() = entry,
        }
    }

    fn try_begin(&self) -> Result<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::ScanInProgress)?;
        Ok(RunGuard {
            running: &self.running,
        })
    }

    /// Unix-millisecond timestamp, strictly greater than any issued before.
    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    /// Run a scan with the current settings.
    ///
    /// When every check is disabled no indicators are fetched and the report
    /// carries the "not scanned" sentinel in all three fields.
    pub async fn run(&self) -> Result<ScanReport> {
        let settings = self.settings.scan_settings()?;
        self.run_with(&settings).await
    }

    /// Run a scan with explicit settings.
    pub async fn run_with(&self, settings: &ScanSettings) -> Result<ScanReport> {
        let _guard = self.try_begin()?;
        let timestamp = self.next_timestamp();

        if settings.nothing_enabled() {
            log::info!("All scans disabled, nothing to do");
            return Ok(ScanReport::not_scanned(timestamp.to_string()));
        }

        log::info!("Starting scan {}", timestamp);

        match self.execute(settings, timestamp).await {
            Ok(report) => {
                self.set_state(ScanState::Completed);
                log::info!(
                    "Scan {} completed with {} matches",
                    report.timestamp,
                    report.threat_count()
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(ScanState::Failed);
                log::error!("Scan {} failed: {}", timestamp, e);
                Err(e)
            }
        }
    }

    async fn execute(&self, settings: &ScanSettings, timestamp: i64) -> Result<ScanReport> {
        self.set_state(ScanState::FetchingIndicators);
        let kinds: Vec<IndicatorKind> = settings
            .enabled_checks()
            .into_iter()
            .map(|check| check.indicator_kind())
            .collect();
        let indicators = Arc::new(self.ingester.ingest(&kinds).await?);

        self.set_state(ScanState::Scanning);
        let (hashes, connections, processes) = tokio::join!(
            self.check_hashes(settings, &indicators),
            self.check_connections(settings, &indicators),
            self.check_processes(settings, &indicators),
        );

        self.set_state(ScanState::AssemblingReport);
        Ok(ScanReport {
            timestamp: timestamp.to_string(),
            malicious_hashes: hashes,
            malicious_connections: connections,
            malicious_processes: processes,
        })
    }

    async fn check_hashes(
        &self,
        settings: &ScanSettings,
        indicators: &IndicatorSet,
    ) -> CheckOutcome {
        if !settings.is_enabled(CheckKind::Hashes) {
            return CheckOutcome::NotScanned;
        }

        let scanned = self
            .hash_scanner
            .scan(
                &settings.scanned_directories,
                &settings.excluded_directories,
                &settings.excluded_hashes,
                &indicators.malicious_hashes,
            )
            .await;

        match scanned {
            Ok((paths, stats)) => {
                log::debug!("Hash scan stats: {:?}", stats);
                CheckOutcome::Matches(paths.iter().map(|p| p.display().to_string()).collect())
            }
            Err(e) => contain_failure(CheckKind::Hashes, e),
        }
    }

    async fn check_connections(
        &self,
        settings: &ScanSettings,
        indicators: &Arc<IndicatorSet>,
    ) -> CheckOutcome {
        if !settings.is_enabled(CheckKind::Connections) {
            return CheckOutcome::NotScanned;
        }

        let matcher = Arc::clone(&self.connections);
        let indicators = Arc::clone(indicators);
        let scanned =
            tokio::task::spawn_blocking(move || matcher.scan(&indicators.malicious_ips)).await;

        match scanned.map_err(Error::from).and_then(|r| r) {
            Ok(ips) => CheckOutcome::Matches(ips),
            Err(e) => contain_failure(CheckKind::Connections, e),
        }
    }

    async fn check_processes(
        &self,
        settings: &ScanSettings,
        indicators: &Arc<IndicatorSet>,
    ) -> CheckOutcome {
        if !settings.is_enabled(CheckKind::Processes) {
            return CheckOutcome::NotScanned;
        }

        let matcher = Arc::clone(&self.processes);
        let indicators = Arc::clone(indicators);
        let excluded = settings.excluded_processes.clone();
        let scanned = tokio::task::spawn_blocking(move || {
            matcher.scan(&indicators.suspicious_processes, &excluded)
        })
        .await;

        match scanned {
            Ok(names) => CheckOutcome::Matches(names),
            Err(e) => contain_failure(CheckKind::Processes, Error::from(e)),
        }
    }
}

/// Degrade a failed check to `Incomplete` without affecting its siblings.
fn contain_failure(check: CheckKind, err: Error) -> CheckOutcome {
    if err.is_recoverable() {
        log::warn!("{} check did not complete: {}", check, err);
    } else {
        log::error!("{} check failed unexpectedly: {}", check, err);
    }
    CheckOutcome::Incomplete(err.to_string())
}

/// Runs scans and hands each report to a sink.
pub struct ScanService {
    engine: Arc<ScanEngine>,
    sink: Arc<dyn ReportSink>,
}

impl ScanService {
    pub fn new(engine: Arc<ScanEngine>, sink: Arc<dyn ReportSink>) -> Self {
        Self { engine, sink }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<ScanEngine> {
        &self.engine
    }

    /// Current engine state.
    pub fn status(&self) -> ScanState {
        self.engine.status()
    }

    /// Run a scan and store the report.
    ///
    /// A report in which every check was disabled is returned but not stored.
    pub async fn start_scan(&self) -> Result<ScanReport> {
        let report = self.engine.run().await?;
        if report.is_skipped() {
            return Ok(report);
        }

        let sink = Arc::clone(&self.sink);
        let stored = report.clone();
        tokio::task::spawn_blocking(move || sink.store(&stored)).await??;

        Ok(report)
    }
}
