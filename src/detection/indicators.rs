//! Indicator list parsing and the per-run indicator set.

use crate::utils::hash::HashCalculator;
use std::collections::HashSet;

/// Marker that turns a feed line into a comment.
const COMMENT_MARKER: char = '#';

/// Yield the usable entries of a newline-delimited indicator list.
///
/// Blank lines and any line containing `#` are dropped; surrounding
/// whitespace (including a trailing `\r`) is trimmed from the rest.
pub fn parse_indicator_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(COMMENT_MARKER))
}

/// Parse a malicious-hash list into normalized (lowercase) hashes.
pub fn parse_hash_list(text: &str) -> HashSet<String> {
    parse_indicator_lines(text)
        .map(HashCalculator::normalize)
        .collect()
}

/// Parse an IP denylist.
pub fn parse_ip_list(text: &str) -> HashSet<String> {
    parse_indicator_lines(text).map(str::to_string).collect()
}

/// Parse the suspicious-process reference list into lowercase fragments.
///
/// File order is kept so that matching is deterministic; duplicates are dropped.
pub fn parse_process_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    parse_indicator_lines(text)
        .map(str::to_lowercase)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Indicators available to one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSet {
    /// Malicious content hashes (lowercase hex)
    pub malicious_hashes: HashSet<String>,
    /// Malicious remote IP addresses
    pub malicious_ips: HashSet<String>,
    /// Lowercase process-name fragments
    pub suspicious_processes: Vec<String>,
}

impl IndicatorSet {
    /// Total number of indicators loaded.
    pub fn len(&self) -> usize {
        self.malicious_hashes.len() + self.malicious_ips.len() + self.suspicious_processes.len()
    }

    /// Whether no indicators are loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blank_lines_dropped() {
        let text = "# header\n1.2.3.4\n\n5.6.7.8 # inline\n   \n9.9.9.9\r\n";
        let parsed: Vec<&str> = parse_indicator_lines(text).collect();
        assert_eq!(parsed, vec!["1.2.3.4", "9.9.9.9"]);
    }

    #[test]
    fn test_every_remaining_line_kept() {
        let lines = ["aaa", "bbb", "#ccc", "", "ddd#", "eee"];
        let text = lines.join("\n");
        let parsed: HashSet<&str> = parse_indicator_lines(&text).collect();
        let expected: HashSet<&str> = lines
            .iter()
            .copied()
            .filter(|l| !l.is_empty() && !l.contains('#'))
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_hash_list_normalized() {
        let hashes = parse_hash_list("# MalwareBazaar\n5D41402ABC4B2A76B9719D911017C592\n");
        assert!(hashes.contains("5d41402abc4b2a76b9719d911017c592"));
        assert_eq!(hashes.len(), 1);
    }

    #[test]
    fn test_process_list_lowercase_and_ordered() {
        let procs = parse_process_list("Miner\nnc\nminer\n# comment\nxmrig\n");
        assert_eq!(procs, vec!["miner", "nc", "xmrig"]);
    }

    #[test]
    fn test_indicator_set_len() {
        let mut set = IndicatorSet::default();
        assert!(set.is_empty());
        set.malicious_ips = parse_ip_list("1.1.1.1\n2.2.2.2");
        set.suspicious_processes = vec!["miner".into()];
        assert_eq!(set.len(), 3);
    }
}
