//! Scan statistics and rendered reports.
//!
//! [`ScanSummary`] condenses a [`ScanResult`] into counters. The same
//! summary feeds the results-file footer, the plain-text notification
//! message and the Markdown report that gets uploaded.

use crate::types::{DomainStatus, ScanResult, TldSet};
use serde::Serialize;
use std::fmt::Write as _;

/// Per-TLD counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TldStats {
    pub tld: String,
    pub checked: usize,
    pub available: usize,
}

impl TldStats {
    pub fn available_percent(&self) -> f64 {
        if self.checked == 0 {
            0.0
        } else {
            self.available as f64 * 100.0 / self.checked as f64
        }
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub checked: usize,
    pub available: usize,
    pub registered: usize,
    pub invalid: usize,
    pub unknown: usize,
    /// Per-TLD counters, in configured TLD order
    pub per_tld: Vec<TldStats>,
    pub elapsed_secs: f64,
    pub interrupted: bool,
}

impl ScanSummary {
    pub fn from_result(result: &ScanResult, tlds: &TldSet) -> Self {
        let mut per_tld: Vec<TldStats> = tlds
            .iter()
            .map(|tld| TldStats {
                tld: tld.as_str().to_string(),
                checked: 0,
                available: 0,
            })
            .collect();

        let mut summary = Self {
            checked: 0,
            available: 0,
            registered: 0,
            invalid: 0,
            unknown: 0,
            per_tld: Vec::new(),
            elapsed_secs: result.elapsed.as_secs_f64(),
            interrupted: result.is_interrupted(),
        };

        for outcome in result.iter() {
            summary.checked += 1;
            match outcome.status {
                DomainStatus::Available => summary.available += 1,
                DomainStatus::Registered => summary.registered += 1,
                DomainStatus::Invalid => summary.invalid += 1,
                // Retryable statuses never survive as final outcomes
                DomainStatus::Unknown | DomainStatus::RateLimited | DomainStatus::TransientError => {
                    summary.unknown += 1
                }
            }

            if let Some(stats) = per_tld.iter_mut().find(|s| s.tld == outcome.tld) {
                stats.checked += 1;
                if outcome.is_available() {
                    stats.available += 1;
                }
            }
        }

        summary.per_tld = per_tld;
        summary
    }

    /// Domains checked per second.
    pub fn rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.checked as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.interrupted {
            "interrupted"
        } else {
            "completed"
        }
    }
}

/// Plain-text summary used for notifications.
pub fn render_text(summary: &ScanSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Domain scan {}", summary.status_label());
    let _ = writeln!(out, "Checked: {}", summary.checked);
    let _ = writeln!(out, "Available: {}", summary.available);
    let _ = writeln!(out, "Registered: {}", summary.registered);
    let _ = writeln!(out, "Unknown: {}", summary.unknown);
    let _ = writeln!(
        out,
        "Duration: {:.1}s ({:.2} domains/s)",
        summary.elapsed_secs,
        summary.rate()
    );
    for tld in &summary.per_tld {
        let _ = writeln!(
            out,
            "{}: checked {}, available {} ({:.1}%)",
            tld.tld,
            tld.checked,
            tld.available,
            tld.available_percent()
        );
    }
    out
}

/// Markdown report for upload.
pub fn render_markdown(summary: &ScanSummary, result: &ScanResult, tlds: &TldSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Domain availability scan");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Generated {} · status **{}** · TLDs {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        summary.status_label(),
        tlds
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Statistics");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Checked: {}", summary.checked);
    let _ = writeln!(out, "- Available: {}", summary.available);
    let _ = writeln!(out, "- Registered: {}", summary.registered);
    let _ = writeln!(out, "- Invalid: {}", summary.invalid);
    let _ = writeln!(out, "- Unknown: {}", summary.unknown);
    let _ = writeln!(
        out,
        "- Duration: {:.1}s ({:.2} domains/s)",
        summary.elapsed_secs,
        summary.rate()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Available domains");
    let _ = writeln!(out);
    let mut any = false;
    for outcome in result.available() {
        any = true;
        let _ = writeln!(out, "- `{}`", outcome.domain);
    }
    if !any {
        let _ = writeln!(out, "_None found._");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Per TLD");
    let _ = writeln!(out);
    let _ = writeln!(out, "| TLD | Checked | Available | % |");
    let _ = writeln!(out, "|---|---:|---:|---:|");
    for tld in &summary.per_tld {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.1} |",
            tld.tld,
            tld.checked,
            tld.available,
            tld.available_percent()
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueryOutcome, ScanCompletion};
    use std::time::Duration;

    fn outcome(domain: &str, tld: &str, status: DomainStatus) -> QueryOutcome {
        QueryOutcome {
            domain: domain.to_string(),
            tld: tld.to_string(),
            status,
            http_status: None,
            attempts: 1,
            error: None,
        }
    }

    fn sample() -> (ScanResult, TldSet) {
        let mut result = ScanResult::new();
        result.push(outcome("a.com", ".com", DomainStatus::Available));
        result.push(outcome("a.org", ".org", DomainStatus::Registered));
        result.push(outcome("b.com", ".com", DomainStatus::Unknown));
        result.push(outcome("b.org", ".org", DomainStatus::Available));
        result.elapsed = Duration::from_secs(2);
        (result, TldSet::parse(&[".com", ".org", ".net"]).unwrap())
    }

    #[test]
    fn test_summary_counts() {
        let (result, tlds) = sample();
        let summary = ScanSummary::from_result(&result, &tlds);

        assert_eq!(summary.checked, 4);
        assert_eq!(summary.available, 2);
        assert_eq!(summary.registered, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.rate(), 2.0);
        assert_eq!(summary.per_tld.len(), 3);
        assert_eq!(summary.per_tld[0].checked, 2);
        assert_eq!(summary.per_tld[0].available_percent(), 50.0);
        assert_eq!(summary.per_tld[2].checked, 0);
        assert_eq!(summary.status_label(), "completed");
    }

    #[test]
    fn test_interrupted_label() {
        let (mut result, tlds) = sample();
        result.completion = ScanCompletion::Interrupted;
        let summary = ScanSummary::from_result(&result, &tlds);
        assert!(render_text(&summary).starts_with("Domain scan interrupted"));
    }

    #[test]
    fn test_markdown_lists_available() {
        let (result, tlds) = sample();
        let summary = ScanSummary::from_result(&result, &tlds);
        let markdown = render_markdown(&summary, &result, &tlds);

        assert!(markdown.starts_with("# Domain availability scan"));
        assert!(markdown.contains("- `a.com`"));
        assert!(markdown.contains("- `b.org`"));
        assert!(!markdown.contains("`a.org`"));
        assert!(markdown.contains("| .net | 0 | 0 | 0.0 |"));
    }

    #[test]
    fn test_markdown_without_available() {
        let result = ScanResult::new();
        let tlds = TldSet::parse(&["com"]).unwrap();
        let summary = ScanSummary::from_result(&result, &tlds);
        assert!(render_markdown(&summary, &result, &tlds).contains("_None found._"));
    }
}
