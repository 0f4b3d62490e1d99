//! Console display for domain-seeker.
//!
//! Colored outcome lines as the scan runs, a short header and the final
//! summary. Uses only the `console` crate.

use console::{pad_str, style, Alignment};
use domain_seeker_lib::{
    DomainSeekerError, DomainStatus, QueryOutcome, ResultSink, ScanSummary, Settings,
};

const DOMAIN_WIDTH: usize = 30;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(settings: &Settings, source: &str) {
    println!(
        "{} {} {}",
        style("domain-seeker").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("- scanning {}", source)).dim(),
    );

    let meta_parts = [
        format!("TLDs: {}", settings.tlds.join(", ")),
        format!("Delay: {:.1}s", settings.delay.as_secs_f64()),
        format!("Retries: {}", settings.max_retries),
    ];
    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Outcome lines ────────────────────────────────────────────────────────────

/// Prints outcomes as they arrive: available domains always, everything
/// else only when verbose.
pub struct ConsoleSink {
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ResultSink for ConsoleSink {
    fn record(&mut self, outcome: &QueryOutcome) -> Result<(), DomainSeekerError> {
        if self.verbose || outcome.is_available() {
            println!("{}", format_outcome(outcome));
        }
        Ok(())
    }
}

/// One aligned, colored line for an outcome.
pub fn format_outcome(outcome: &QueryOutcome) -> String {
    let padded = pad_str(&outcome.domain, DOMAIN_WIDTH, Alignment::Left, Some(".."));
    let label = outcome.status.label().to_uppercase();

    let status = match outcome.status {
        DomainStatus::Available => style(label).green().bold().to_string(),
        DomainStatus::Registered => style(label).red().to_string(),
        DomainStatus::Invalid => style(label).magenta().to_string(),
        _ => style(label).yellow().to_string(),
    };

    let detail = match brief_error(outcome) {
        Some(reason) => format!("  {}", style(reason).dim()),
        None if outcome.attempts > 1 => {
            format!("  {}", style(format!("({} attempts)", outcome.attempts)).dim())
        }
        None => String::new(),
    };

    format!("  {}  {}{}", padded, status, detail)
}

/// Short reason for an unresolved outcome.
fn brief_error(outcome: &QueryOutcome) -> Option<&'static str> {
    if outcome.status != DomainStatus::Unknown {
        return None;
    }
    let message = outcome.error.as_deref().unwrap_or_default().to_lowercase();
    Some(if message.contains("rate limited") {
        "(rate limited)"
    } else if message.contains("timed out") {
        "(timeout)"
    } else if message.contains("connection") {
        "(network error)"
    } else if message.contains("http") {
        "(unexpected response)"
    } else {
        "(error)"
    })
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the end-of-run summary block.
pub fn print_summary(summary: &ScanSummary) {
    println!();
    let headline = if summary.interrupted {
        style("Scan interrupted").yellow().bold()
    } else {
        style("Scan completed").green().bold()
    };
    println!(
        "{} {}",
        headline,
        style(format!(
            "in {:.1}s ({:.2} domains/s)",
            summary.elapsed_secs,
            summary.rate()
        ))
        .dim()
    );

    println!(
        "  {} checked, {} available, {} registered, {} invalid, {} unknown",
        summary.checked,
        style(summary.available).green().bold(),
        summary.registered,
        summary.invalid,
        summary.unknown,
    );

    for tld in &summary.per_tld {
        println!(
            "  {} {:<8} {} checked, {} available ({:.1}%)",
            style("•").dim(),
            tld.tld,
            tld.checked,
            tld.available,
            tld.available_percent(),
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
