//! Result sinks.
//!
//! - [`ResultsFileSink`] writes available domains to a text file as they
//!   are found and appends a statistics footer at the end.
//! - [`FanoutSink`] forwards every outcome to several sinks.
//! - [`NullSink`] drops everything.

use crate::error::DomainSeekerError;
use crate::report::ScanSummary;
use crate::scanner::ResultSink;
use crate::types::{QueryOutcome, ScanResult, TldSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Discards all outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn record(&mut self, _outcome: &QueryOutcome) -> Result<(), DomainSeekerError> {
        Ok(())
    }
}

/// Forwards outcomes to every inner sink. A failing sink is logged and the
/// remaining sinks still receive the outcome.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn ResultSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink<S: ResultSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn ResultSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for FanoutSink {
    fn record(&mut self, outcome: &QueryOutcome) -> Result<(), DomainSeekerError> {
        for sink in &mut self.sinks {
            if let Err(err) = sink.record(outcome) {
                warn!(domain = %outcome.domain, error = %err, "Result sink failed");
            }
        }
        Ok(())
    }

    fn finish(&mut self, result: &ScanResult) -> Result<(), DomainSeekerError> {
        for sink in &mut self.sinks {
            if let Err(err) = sink.finish(result) {
                warn!(error = %err, "Result sink failed to finish");
            }
        }
        Ok(())
    }
}

/// Text results file: header, one line per available domain, statistics footer.
pub struct ResultsFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    tlds: TldSet,
}

impl ResultsFileSink {
    /// Create (or truncate) the results file and write its header.
    pub fn create<P: AsRef<Path>>(path: P, tlds: &TldSet) -> Result<Self, DomainSeekerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            DomainSeekerError::file_error(path.display().to_string(), e.to_string())
        })?;

        let mut sink = Self {
            path,
            writer: BufWriter::new(file),
            tlds: tlds.clone(),
        };
        sink.write_header()?;
        debug!(path = %sink.path.display(), "Results file opened");
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_header(&mut self) -> Result<(), DomainSeekerError> {
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
        let header = format!(
            "# Domain availability scan - {}\n# TLDs: {}\n\n{:<30} | {:<15} | {}\n{}-+-{}-+-{}\n",
            now,
            self.tlds,
            "domain",
            "status",
            "checked at",
            "-".repeat(30),
            "-".repeat(15),
            "-".repeat(19),
        );
        self.write_flushed(&header)
    }

    fn write_flushed(&mut self, text: &str) -> Result<(), DomainSeekerError> {
        self.writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| DomainSeekerError::sink(self.path.display().to_string(), e.to_string()))
    }
}

impl ResultSink for ResultsFileSink {
    fn record(&mut self, outcome: &QueryOutcome) -> Result<(), DomainSeekerError> {
        if !outcome.is_available() {
            return Ok(());
        }

        let line = format!(
            "{:<30} | {:<15} | {}\n",
            outcome.domain,
            outcome.status.label(),
            chrono::Local::now().format(TIMESTAMP_FORMAT)
        );
        self.write_flushed(&line)
    }

    fn finish(&mut self, result: &ScanResult) -> Result<(), DomainSeekerError> {
        let summary = ScanSummary::from_result(result, &self.tlds);

        let mut footer = format!(
            "\n# --- Statistics ---\n# Finished: {}\n# Status: {}\n# Checked: {}\n# Available: {}\n# Registered: {}\n# Unknown: {}\n# Duration: {:.1}s\n\n# --- Per TLD ---\n",
            chrono::Local::now().format(TIMESTAMP_FORMAT),
            summary.status_label(),
            summary.checked,
            summary.available,
            summary.registered,
            summary.unknown,
            summary.elapsed_secs,
        );
        for tld in &summary.per_tld {
            footer.push_str(&format!(
                "# {}: checked {}, available {}\n",
                tld.tld, tld.checked, tld.available
            ));
        }

        self.write_flushed(&footer)
    }
}
