//! Core type definitions used throughout ioc-sweep.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Kind of threat-intelligence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// Malicious file content hashes
    Hashes,
    /// Malicious remote IP addresses
    Ips,
    /// Suspicious process-name fragments
    Processes,
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorKind::Hashes => write!(f, "hash"),
            IndicatorKind::Ips => write!(f, "IP"),
            IndicatorKind::Processes => write!(f, "process"),
        }
    }
}

/// The three checks a scan pass can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// File hash check
    Hashes,
    /// Outbound connection check
    Connections,
    /// Running process check
    Processes,
}

impl CheckKind {
    /// Placeholder text reported when this check was disabled for a run.
    pub fn not_scanned_text(&self) -> &'static str {
        match self {
            CheckKind::Hashes => "File hashes not scanned",
            CheckKind::Connections => "IP connections not scanned",
            CheckKind::Processes => "Processes not scanned",
        }
    }

    /// The indicator kind this check matches against.
    pub fn indicator_kind(&self) -> IndicatorKind {
        match self {
            CheckKind::Hashes => IndicatorKind::Hashes,
            CheckKind::Connections => IndicatorKind::Ips,
            CheckKind::Processes => IndicatorKind::Processes,
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::Hashes => write!(f, "File Hashes"),
            CheckKind::Connections => write!(f, "Connections"),
            CheckKind::Processes => write!(f, "Processes"),
        }
    }
}

/// Outcome of a single check within a scan pass.
///
/// `NotScanned` is the sentinel for a check disabled by settings, which is
/// distinct from `Matches(vec![])` ("scanned, nothing found").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The check ran; these entries matched an indicator
    Matches(Vec<String>),
    /// The check was disabled for this run
    NotScanned,
    /// The check was enabled but could not complete
    Incomplete(String),
}

impl CheckOutcome {
    /// Matched entries, empty for the sentinel variants.
    pub fn matches(&self) -> &[String] {
        match self {
            CheckOutcome::Matches(m) => m,
            _ => &[],
        }
    }

    /// Whether the check actually ran to completion.
    pub fn is_scanned(&self) -> bool {
        matches!(self, CheckOutcome::Matches(_))
    }

    /// Render the outcome as report lines, using the sentinel text for
    /// checks that did not run.
    pub fn lines(&self, check: CheckKind) -> Vec<String> {
        match self {
            CheckOutcome::Matches(m) => m.clone(),
            CheckOutcome::NotScanned => vec![check.not_scanned_text().to_string()],
            CheckOutcome::Incomplete(reason) => {
                vec![format!("{} could not complete: {}", check, reason)]
            }
        }
    }
}

/// Point-in-time report produced by one scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Run start time in Unix milliseconds; unique per run and used as the storage key
    pub timestamp: String,
    /// Local file paths whose content hash matched an indicator
    pub malicious_hashes: CheckOutcome,
    /// Remote IP addresses of connections that matched an indicator
    pub malicious_connections: CheckOutcome,
    /// Running process names that matched an indicator
    pub malicious_processes: CheckOutcome,
}

impl ScanReport {
    /// Create a report in which no check ran.
    pub fn not_scanned(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            malicious_hashes: CheckOutcome::NotScanned,
            malicious_connections: CheckOutcome::NotScanned,
            malicious_processes: CheckOutcome::NotScanned,
        }
    }

    /// Whether every check was disabled for this run.
    pub fn is_skipped(&self) -> bool {
        [
            &self.malicious_hashes,
            &self.malicious_connections,
            &self.malicious_processes,
        ]
        .iter()
        .all(|outcome| **outcome == CheckOutcome::NotScanned)
    }

    /// Outcome of the given check.
    pub fn outcome(&self, check: CheckKind) -> &CheckOutcome {
        match check {
            CheckKind::Hashes => &self.malicious_hashes,
            CheckKind::Connections => &self.malicious_connections,
            CheckKind::Processes => &self.malicious_processes,
        }
    }

    /// Total number of matches across all checks.
    pub fn threat_count(&self) -> usize {
        self.malicious_hashes.matches().len()
            + self.malicious_connections.matches().len()
            + self.malicious_processes.matches().len()
    }

    /// Run start time, if the timestamp is well formed.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.timestamp.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// Lifecycle state of the scan engine.
///
/// `Completed` is held briefly after a successful run and then reads as
/// `Idle` again. `Failed` stays until the next run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No scan running
    Idle,
    /// Acquiring indicator sets
    FetchingIndicators,
    /// Running the enabled checks
    Scanning,
    /// Building the report
    AssemblingReport,
    /// Last scan finished successfully
    Completed,
    /// Last scan failed
    Failed,
}

impl ScanState {
    /// Whether a scan is currently in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ScanState::FetchingIndicators | ScanState::Scanning | ScanState::AssemblingReport
        )
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::FetchingIndicators => write!(f, "fetching-indicators"),
            ScanState::Scanning => write!(f, "scanning"),
            ScanState::AssemblingReport => write!(f, "assembling-report"),
            ScanState::Completed => write!(f, "completed"),
            ScanState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_scanned_report() {
        let report = ScanReport::not_scanned("1700000000000");
        assert_eq!(report.malicious_hashes, CheckOutcome::NotScanned);
        assert_eq!(report.malicious_connections, CheckOutcome::NotScanned);
        assert_eq!(report.malicious_processes, CheckOutcome::NotScanned);
        assert_eq!(report.threat_count(), 0);
        assert!(report.is_skipped());
        assert_eq!(
            report.malicious_hashes.lines(CheckKind::Hashes),
            vec!["File hashes not scanned".to_string()]
        );
    }

    #[test]
    fn test_empty_matches_differ_from_sentinel() {
        let scanned = CheckOutcome::Matches(Vec::new());
        assert!(scanned.is_scanned());
        assert!(scanned.lines(CheckKind::Connections).is_empty());
        assert_ne!(scanned, CheckOutcome::NotScanned);
        assert!(!CheckOutcome::Incomplete("x".into()).is_scanned());

        let mut report = ScanReport::not_scanned("1700000000000");
        report.malicious_processes = scanned;
        assert!(!report.is_skipped());
    }

    #[test]
    fn test_threat_count_and_start_time() {
        let report = ScanReport {
            timestamp: "1700000000123".to_string(),
            malicious_hashes: CheckOutcome::Matches(vec!["/tmp/a".into(), "/tmp/b".into()]),
            malicious_connections: CheckOutcome::Matches(vec!["1.2.3.4".into()]),
            malicious_processes: CheckOutcome::NotScanned,
        };
        assert_eq!(report.threat_count(), 3);
        assert_eq!(
            report.started_at().map(|t| t.timestamp_millis()),
            Some(1_700_000_000_123)
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&CheckOutcome::NotScanned).unwrap();
        assert_eq!(json, r#"{"status":"not_scanned"}"#);
        let back: CheckOutcome =
            serde_json::from_str(r#"{"status":"matches","detail":["9.9.9.9"]}"#).unwrap();
        assert_eq!(back, CheckOutcome::Matches(vec!["9.9.9.9".into()]));
    }

    #[test]
    fn test_scan_state_busy() {
        assert!(ScanState::Scanning.is_busy());
        assert!(!ScanState::Completed.is_busy());
        assert_eq!(ScanState::FetchingIndicators.to_string(), "fetching-indicators");
    }
}
