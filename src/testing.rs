//! In-memory collaborators shared by unit tests.

use crate::core::error::{Error, Result};
use crate::core::types::ScanReport;
use crate::detection::{IndicatorCache, IndicatorFetcher};
use crate::scanner::network::ConnectionTable;
use crate::scanner::process::ProcessTable;
use crate::scanner::results::ReportSink;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const HASH_URL: &str = "https://feeds.test/hashes.txt";
pub const IP_URL: &str = "https://feeds.test/ips.txt";

/// Fetcher serving canned bodies; unknown URLs fail.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndicatorFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.get(url).cloned().ok_or_else(|| {
            Error::feed_request(
                url,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "offline"),
            )
        })
    }
}

/// Cache with optional contents per list; `None` means unreadable.
#[derive(Default)]
pub struct FakeCache {
    pub hashes: Option<String>,
    pub ips: Option<String>,
    pub processes: Option<String>,
}

fn cached(name: &str, value: &Option<String>) -> Result<String> {
    value.clone().ok_or_else(|| {
        Error::file_read(
            name,
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        )
    })
}

impl IndicatorCache for FakeCache {
    fn read_cached_hash_list(&self) -> Result<String> {
        cached("full_hashes.txt", &self.hashes)
    }

    fn read_cached_ip_list(&self) -> Result<String> {
        cached("full_ips.txt", &self.ips)
    }

    fn read_suspicious_process_list(&self) -> Result<String> {
        cached("procs.txt", &self.processes)
    }
}

/// Connection table returning fixed remote addresses, or failing.
pub struct FakeConnections(pub Option<Vec<IpAddr>>);

impl ConnectionTable for FakeConnections {
    fn remote_addresses(&self) -> Result<Vec<IpAddr>> {
        self.0
            .clone()
            .ok_or_else(|| Error::ConnectionTable("permission denied".to_string()))
    }
}

/// Process table returning fixed names, or failing.
pub struct FakeProcesses(pub Option<Vec<String>>);

impl ProcessTable for FakeProcesses {
    fn process_names(&self) -> Result<Vec<String>> {
        self.0
            .clone()
            .ok_or_else(|| Error::ProcessEnumeration("no /proc".to_string()))
    }
}

/// Sink that keeps reports in memory.
#[derive(Default)]
pub struct MemorySink {
    pub reports: Mutex<Vec<ScanReport>>,
}

impl ReportSink for MemorySink {
    fn store(&self, report: &ScanReport) -> Result<()> {
        self.reports
            .lock()
            .map_err(|_| Error::lock_poisoned("memory sink"))?
            .push(report.clone());
        Ok(())
    }
}
