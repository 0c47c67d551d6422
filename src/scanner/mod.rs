//! Local system checks and scan orchestration.
//!
//! This module provides:
//! - Concurrent file hashing against the malicious-hash set
//! - Outbound TCP connection matching
//! - Running process matching
//! - The scan engine tying the checks together
//! - Report persistence

pub mod engine;
pub mod file;
pub mod network;
pub mod process;
pub mod results;

pub use engine::{ScanEngine, ScanService};
pub use file::{HashScanStats, HashScanner};
pub use network::{ConnectionMatcher, ConnectionTable, SystemConnectionTable};
pub use process::{ProcessMatcher, ProcessTable, SystemProcessTable};
pub use results::{ReportSink, ReportStore};
