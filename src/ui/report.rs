//! Text rendering of scan reports.

use crate::core::types::{CheckKind, ScanReport};
use std::fmt::Write;

const CHECKS: [CheckKind; 3] = [CheckKind::Hashes, CheckKind::Connections, CheckKind::Processes];

/// Full multi-section rendering of a report.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Scan Report ===");
    let _ = writeln!(out, "Timestamp:       {}", report.timestamp);
    if let Some(started) = report.started_at() {
        let _ = writeln!(
            out,
            "Started:         {}",
            started.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    let _ = writeln!(out, "Threats Found:   {}", report.threat_count());

    for check in CHECKS {
        let outcome = report.outcome(check);
        let _ = writeln!(out);
        let _ = writeln!(out, "{} ({}):", check, outcome.matches().len());

        let lines = outcome.lines(check);
        if lines.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for line in lines {
            let _ = writeln!(out, "  {}", line);
        }
    }

    out
}

/// One-line summary used by report listings.
pub fn render_report_summary(report: &ScanReport) -> String {
    let started = report
        .started_at()
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());

    let checks: Vec<String> = CHECKS
        .iter()
        .map(|check| {
            let outcome = report.outcome(*check);
            if outcome.is_scanned() {
                format!("{}={}", short_name(*check), outcome.matches().len())
            } else {
                format!("{}=-", short_name(*check))
            }
        })
        .collect();

    format!(
        "{:<15} {:<20} {:>3} threats  [{}]",
        report.timestamp,
        started,
        report.threat_count(),
        checks.join(" ")
    )
}

fn short_name(check: CheckKind) -> &'static str {
    match check {
        CheckKind::Hashes => "files",
        CheckKind::Connections => "ips",
        CheckKind::Processes => "procs",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CheckOutcome;

    fn sample() -> ScanReport {
        ScanReport {
            timestamp: "1700000000000".to_string(),
            malicious_hashes: CheckOutcome::Matches(vec!["/tmp/scan/a.txt".to_string()]),
            malicious_connections: CheckOutcome::Incomplete("permission denied".to_string()),
            malicious_processes: CheckOutcome::NotScanned,
        }
    }

    #[test]
    fn test_render_report_sections() {
        let text = render_report(&sample());
        assert!(text.contains("Threats Found:   1"));
        assert!(text.contains("  /tmp/scan/a.txt"));
        assert!(text.contains("could not complete: permission denied"));
        assert!(text.contains("Processes not scanned"));
    }

    #[test]
    fn test_render_empty_matches() {
        let report = ScanReport {
            malicious_hashes: CheckOutcome::Matches(vec![]),
            ..sample()
        };
        assert!(render_report(&report).contains("(none)"));
    }

    #[test]
    fn test_summary_line() {
        let line = render_report_summary(&sample());
        assert!(line.starts_with("1700000000000"));
        assert!(line.contains("files=1 ips=- procs=-"));
    }
}
