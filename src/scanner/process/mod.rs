//! Running-process matching against the suspicious-process list.
//!
//! This module provides:
//! - Process listing (name and executable path)
//! - Case-insensitive substring matching with an exclusion list

pub mod enumerate;

pub use enumerate::{ProcessInfo, ProcessTable, SystemProcessTable};

use std::collections::HashSet;
use std::sync::Arc;

/// Substring-matches running process names against suspicious fragments.
pub struct ProcessMatcher {
    table: Arc<dyn ProcessTable>,
}

impl ProcessMatcher {
    /// Create a matcher over the given process table.
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        Self { table }
    }

    /// Lowercased names of processes containing a suspicious fragment.
    ///
    /// A name containing any excluded fragment is never reported. Each
    /// process is reported at most once. Enumeration failure is logged and
    /// yields no matches.
    pub fn scan(&self, suspicious: &[String], excluded: &HashSet<String>) -> Vec<String> {
        let names = match self.table.process_names() {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Failed to get process list: {}", e);
                return Vec::new();
            }
        };
        log::debug!("Checking {} running processes", names.len());

        let excluded: Vec<String> = excluded
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        let mut matches = Vec::new();
        for name in names {
            let name = name.to_lowercase();

            if excluded.iter().any(|e| name.contains(e.as_str())) {
                log::trace!("Process excluded: {}", name);
                continue;
            }

            if let Some(fragment) = suspicious
                .iter()
                .find(|s| !s.is_empty() && name.contains(s.as_str()))
            {
                log::info!("Suspicious process: {} (matched '{}')", name, fragment);
                matches.push(name);
            }
        }

        matches
    }
}

impl Default for ProcessMatcher {
    fn default() -> Self {
        Self::new(Arc::new(SystemProcessTable::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProcesses;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_substring_match() {
        let matcher = ProcessMatcher::new(Arc::new(FakeProcesses(names(&[
            "/usr/bin/xmrminer",
            "/usr/bin/bash",
        ]))));
        let matches = matcher.scan(&list(&["miner"]), &HashSet::new());
        assert_eq!(matches, vec!["/usr/bin/xmrminer".to_string()]);
    }

    #[test]
    fn test_names_are_lowercased() {
        let matcher = ProcessMatcher::new(Arc::new(FakeProcesses(names(&["C:\\Tools\\XMRig.exe"]))));
        let matches = matcher.scan(&list(&["xmrig"]), &HashSet::new());
        assert_eq!(matches, vec!["c:\\tools\\xmrig.exe".to_string()]);
    }

    #[test]
    fn test_one_match_per_process() {
        let matcher = ProcessMatcher::new(Arc::new(FakeProcesses(names(&["cryptominer"]))));
        let matches = matcher.scan(&list(&["miner", "crypto"]), &HashSet::new());
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_exclusion_wins() {
        let matcher = ProcessMatcher::new(Arc::new(FakeProcesses(names(&[
            "/opt/minerd",
            "/opt/legit-miner-monitor",
        ]))));
        let excluded = HashSet::from(["Monitor".to_string()]);
        let matches = matcher.scan(&list(&["miner"]), &excluded);
        assert_eq!(matches, vec!["/opt/minerd".to_string()]);
    }

    #[test]
    fn test_enumeration_failure_yields_no_matches() {
        let matcher = ProcessMatcher::new(Arc::new(FakeProcesses(None)));
        assert!(matcher.scan(&list(&["miner"]), &HashSet::new()).is_empty());
    }
}
