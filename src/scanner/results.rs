//! Scan report persistence.

use crate::core::error::{Error, Result};
use crate::core::types::{CheckOutcome, ScanReport};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// Default database filename for scan reports.
const DEFAULT_REPORTS_DB: &str = "reports.db";

/// Destination for completed scan reports.
pub trait ReportSink: Send + Sync {
    /// Persist a report under its timestamp.
    fn store(&self, report: &ScanReport) -> Result<()>;
}

/// SQLite-backed report history.
pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    /// Open or create a report store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::DatabaseInit(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::DatabaseInit(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Open the report store inside `data_dir`, creating the directory.
    pub fn open_default(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| Error::DirectoryAccess {
            path: data_dir.to_path_buf(),
            source: e,
        })?;
        Self::open(&data_dir.join(DEFAULT_REPORTS_DB))
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                timestamp TEXT PRIMARY KEY,
                started_at INTEGER NOT NULL,
                malicious_hashes TEXT NOT NULL,
                malicious_connections TEXT NOT NULL,
                malicious_processes TEXT NOT NULL,
                threat_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_reports_started_at ON reports(started_at DESC);
            "#,
        )
        .map_err(|e| Error::DatabaseInit(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::lock_poisoned("reports database"))
    }

    /// Save a report, replacing any report with the same timestamp.
    pub fn save(&self, report: &ScanReport) -> Result<()> {
        let started_at = report.timestamp.parse::<i64>().unwrap_or_default();
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO reports
            (timestamp, started_at, malicious_hashes, malicious_connections,
             malicious_processes, threat_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                report.timestamp,
                started_at,
                serde_json::to_string(&report.malicious_hashes)?,
                serde_json::to_string(&report.malicious_connections)?,
                serde_json::to_string(&report.malicious_processes)?,
                report.threat_count() as i64,
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        log::debug!("Stored report {}", report.timestamp);
        Ok(())
    }

    /// Load a report by timestamp.
    pub fn load(&self, timestamp: &str) -> Result<Option<ScanReport>> {
        let conn = self.lock()?;

        let raw = conn
            .query_row(
                r#"
                SELECT timestamp, malicious_hashes, malicious_connections, malicious_processes
                FROM reports WHERE timestamp = ?1
                "#,
                params![timestamp],
                RawReport::from_row,
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        raw.map(RawReport::decode).transpose()
    }

    /// Most recent reports, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<ScanReport>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT timestamp, malicious_hashes, malicious_connections, malicious_processes
                FROM reports ORDER BY started_at DESC LIMIT ?1
                "#,
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit as i64], RawReport::from_row)
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut reports = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| Error::Database(e.to_string()))?;
            reports.push(raw.decode()?);
        }

        Ok(reports)
    }

    /// Number of stored reports.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count as u64)
    }

    /// Delete one report. Returns `false` if it did not exist.
    pub fn delete(&self, timestamp: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM reports WHERE timestamp = ?1", params![timestamp])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(deleted > 0)
    }

    /// Delete all reports, returning how many were removed.
    pub fn clear(&self) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM reports", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        log::info!("Cleared {} stored reports", deleted);
        Ok(deleted as u64)
    }
}

impl ReportSink for ReportStore {
    fn store(&self, report: &ScanReport) -> Result<()> {
        self.save(report)
    }
}

/// Row as stored, before the outcome columns are decoded.
struct RawReport {
    timestamp: String,
    hashes: String,
    connections: String,
    processes: String,
}

impl RawReport {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            timestamp: row.get(0)?,
            hashes: row.get(1)?,
            connections: row.get(2)?,
            processes: row.get(3)?,
        })
    }

    fn decode(self) -> Result<ScanReport> {
        let outcome = |json: &str| serde_json::from_str::<CheckOutcome>(json);
        Ok(ScanReport {
            malicious_hashes: outcome(&self.hashes)?,
            malicious_connections: outcome(&self.connections)?,
            malicious_processes: outcome(&self.processes)?,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report(timestamp: i64, hashes: &[&str]) -> ScanReport {
        ScanReport {
            timestamp: timestamp.to_string(),
            malicious_hashes: CheckOutcome::Matches(hashes.iter().map(|s| s.to_string()).collect()),
            malicious_connections: CheckOutcome::Incomplete("permission denied".into()),
            malicious_processes: CheckOutcome::NotScanned,
        }
    }

    #[test]
    fn test_save_and_load_report() {
        let store = ReportStore::open_in_memory().unwrap();
        let original = report(1_700_000_000_000, &["/tmp/scan/a.txt"]);

        store.store(&original).unwrap();

        let loaded = store.load(&original.timestamp).unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(store.load("42").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let store = ReportStore::open_in_memory().unwrap();
        // Numeric, not lexicographic, ordering
        for ts in [9_000, 10_000, 800] {
            store.save(&report(ts, &[])).unwrap();
        }

        let recent = store.list(2).unwrap();
        let stamps: Vec<&str> = recent.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["10000", "9000"]);
    }

    #[test]
    fn test_delete_and_clear() {
        let store = ReportStore::open_in_memory().unwrap();
        for ts in 1..=3 {
            store.save(&report(ts, &[])).unwrap();
        }

        assert!(store.delete("2").unwrap());
        assert!(!store.delete("2").unwrap());
        assert_eq!(store.count().unwrap(), 2);

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_reports_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = ReportStore::open_default(dir.path()).unwrap();
            store.save(&report(5, &["/x"])).unwrap();
        }
        let store = ReportStore::open_default(dir.path()).unwrap();
        assert_eq!(store.load("5").unwrap().unwrap().threat_count(), 1);
    }
}
