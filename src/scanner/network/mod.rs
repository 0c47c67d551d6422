//! Outbound connection matching against the malicious-IP set.
//!
//! This module provides:
//! - TCP connection table enumeration
//! - Remote-address matching against indicator IPs

pub mod connections;

pub use connections::{
    Connection, ConnectionState, ConnectionTable, ConnectionType, SystemConnectionTable,
};

use crate::core::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Matches live TCP remote addresses against the malicious-IP set.
pub struct ConnectionMatcher {
    table: Arc<dyn ConnectionTable>,
}

impl ConnectionMatcher {
    /// Create a matcher over the given connection table.
    pub fn new(table: Arc<dyn ConnectionTable>) -> Self {
        Self { table }
    }

    /// Remote addresses present in `malicious_ips`.
    ///
    /// One entry is reported per matching connection, so an address with
    /// several open connections appears several times. A table read
    /// failure is returned to the caller.
    pub fn scan(&self, malicious_ips: &HashSet<String>) -> Result<Vec<String>> {
        let remotes = self.table.remote_addresses()?;
        log::debug!("Checking {} remote connections", remotes.len());

        let matches: Vec<String> = remotes
            .into_iter()
            .map(|addr| addr.to_string())
            .filter(|addr| malicious_ips.contains(addr))
            .collect();

        for addr in &matches {
            log::info!("Connection to malicious IP: {}", addr);
        }

        Ok(matches)
    }
}

impl Default for ConnectionMatcher {
    fn default() -> Self {
        Self::new(Arc::new(SystemConnectionTable::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::testing::FakeConnections;
    use std::net::IpAddr;

    fn addrs(list: &[&str]) -> Option<Vec<IpAddr>> {
        Some(list.iter().map(|a| a.parse().unwrap()).collect())
    }

    fn ips(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reports_malicious_remotes() {
        let matcher = ConnectionMatcher::new(Arc::new(FakeConnections(addrs(&[
            "1.2.3.4", "9.9.9.9",
        ]))));
        let matches = matcher.scan(&ips(&["1.2.3.4"])).unwrap();
        assert_eq!(matches, vec!["1.2.3.4".to_string()]);
    }

    #[test]
    fn test_duplicate_connections_kept() {
        let matcher = ConnectionMatcher::new(Arc::new(FakeConnections(addrs(&[
            "1.2.3.4", "1.2.3.4", "5.6.7.8",
        ]))));
        let matches = matcher.scan(&ips(&["1.2.3.4"])).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_ipv6_remote_matches_textual_form() {
        let matcher = ConnectionMatcher::new(Arc::new(FakeConnections(addrs(&["2001:db8::1"]))));
        let matches = matcher.scan(&ips(&["2001:db8::1"])).unwrap();
        assert_eq!(matches, vec!["2001:db8::1".to_string()]);
    }

    #[test]
    fn test_table_failure_propagates() {
        let matcher = ConnectionMatcher::new(Arc::new(FakeConnections(None)));
        let err = matcher.scan(&ips(&["1.2.3.4"])).unwrap_err();
        assert!(matches!(err, Error::ConnectionTable(_)));
    }
}
