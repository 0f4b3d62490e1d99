//! The scan loop.
//!
//! [`Scanner::run`] pulls base names from a [`DomainSource`], expands each
//! across the configured TLDs, and drives every candidate through the retry
//! controller one at a time. Outcomes are appended to the [`ScanResult`] in
//! query order and streamed to a [`ResultSink`] as they arrive.

use crate::error::DomainSeekerError;
use crate::pacing::Pacer;
use crate::protocols::rdap::{RdapClient, RdapTransport};
use crate::retry::{Attempted, RetryController};
use crate::source::DomainSource;
use crate::types::{DomainStatus, QueryOutcome, ScanCompletion, ScanConfig, ScanResult};
use crate::utils::candidates_for;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Minimum spacing between two progress log lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Cooperative cancellation flag shared between the scanner and whoever
/// wants to stop it (typically a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives outcomes as they are produced.
///
/// Sink failures are logged by the scanner and never end a run.
pub trait ResultSink: Send {
    fn record(&mut self, outcome: &QueryOutcome) -> Result<(), DomainSeekerError>;

    /// Called once after a run completes or is interrupted.
    fn finish(&mut self, _result: &ScanResult) -> Result<(), DomainSeekerError> {
        Ok(())
    }
}

/// Where a failed run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    /// Settings or the domain source were unusable before anything was queried
    Configuration,
    /// The domain source broke while the scan was running
    Source,
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// A run that ended on a fatal error.
#[derive(Debug)]
pub struct ScanFailure {
    pub stage: ScanStage,
    /// Outcomes produced before the failure; still valid
    pub partial: ScanResult,
    pub error: DomainSeekerError,
}

impl ScanFailure {
    fn new(partial: ScanResult, error: DomainSeekerError) -> Self {
        let stage = if partial.is_empty() && error.is_configuration() {
            ScanStage::Configuration
        } else {
            ScanStage::Source
        };
        Self {
            stage,
            partial,
            error,
        }
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan failed at {} stage after {} outcomes: {}",
            self.stage,
            self.partial.len(),
            self.error
        )
    }
}

impl std::error::Error for ScanFailure {}

// Running counters for the periodic progress line.
struct Progress {
    started: Instant,
    last_log: Instant,
    checked: usize,
    available: usize,
    unknown: usize,
}

impl Progress {
    fn new(started: Instant) -> Self {
        Self {
            started,
            last_log: started,
            checked: 0,
            available: 0,
            unknown: 0,
        }
    }

    fn observe(&mut self, outcome: &QueryOutcome) {
        self.checked += 1;
        match outcome.status {
            DomainStatus::Available => self.available += 1,
            DomainStatus::Unknown => self.unknown += 1,
            _ => {}
        }

        if self.last_log.elapsed() >= PROGRESS_INTERVAL {
            self.last_log = Instant::now();
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.checked as f64 / elapsed
            } else {
                0.0
            };
            info!(
                checked = self.checked,
                available = self.available,
                unknown = self.unknown,
                rate = format!("{:.2}/s", rate),
                "Scan progress"
            );
        }
    }
}

/// Sequential scanning engine.
pub struct Scanner<T> {
    client: RdapClient<T>,
    config: ScanConfig,
    stop: StopSignal,
}

impl<T: RdapTransport> Scanner<T> {
    pub fn new(client: RdapClient<T>, config: ScanConfig) -> Self {
        Self {
            client,
            config,
            stop: StopSignal::new(),
        }
    }

    /// Use an externally owned stop signal.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn client(&self) -> &RdapClient<T> {
        &self.client
    }

    /// Scan every name the source yields.
    ///
    /// The source is consumed exactly once. On success the sink's `finish`
    /// is called with the final result; on failure the partial result is
    /// handed back inside [`ScanFailure`] and the sink is left unfinished.
    pub async fn run(
        &self,
        source: &mut dyn DomainSource,
        sink: &mut dyn ResultSink,
    ) -> Result<ScanResult, ScanFailure> {
        let started = Instant::now();
        let mut result = ScanResult::new();

        if let Err(err) = self.client.bootstrap().ensure_covers(&self.config.tlds) {
            let failure = ScanFailure::new(result, err);
            error!(
                stage = %failure.stage,
                outcomes = 0,
                error = %failure.error,
                "Cannot scan configured TLDs"
            );
            return Err(failure);
        }

        info!(
            source = %source.describe(),
            tlds = %self.config.tlds,
            delay = ?self.config.delay,
            max_retries = self.config.max_retries,
            "Starting scan"
        );

        let controller = RetryController::new(&self.client, self.config.max_retries);
        let mut pacer = Pacer::new(self.config.delay);
        let mut progress = Progress::new(started);

        'names: loop {
            if self.stop.is_raised() {
                result.completion = ScanCompletion::Interrupted;
                break;
            }

            let base = match source.next_name() {
                Ok(Some(base)) => base,
                Ok(None) => break,
                Err(err) => {
                    result.elapsed = started.elapsed();
                    let failure = ScanFailure::new(result, err);
                    error!(
                        stage = %failure.stage,
                        outcomes = failure.partial.len(),
                        error = %failure.error,
                        "Domain source failed"
                    );
                    return Err(failure);
                }
            };

            for candidate in candidates_for(&base, &self.config.tlds) {
                match controller.execute(&candidate, &mut pacer, &self.stop).await {
                    Ok(Attempted::Finished(outcome)) => {
                        if let Err(err) = sink.record(&outcome) {
                            warn!(domain = %outcome.domain, error = %err, "Result sink failed");
                        }
                        progress.observe(&outcome);
                        result.push(outcome);
                    }
                    Ok(Attempted::Cancelled { attempts }) => {
                        info!(domain = %candidate, attempts, "Stop requested, abandoning domain");
                        result.completion = ScanCompletion::Interrupted;
                        break 'names;
                    }
                    Err(err) => {
                        result.elapsed = started.elapsed();
                        let failure = ScanFailure::new(result, err);
                        error!(
                            stage = %failure.stage,
                            outcomes = failure.partial.len(),
                            error = %failure.error,
                            "Query failed, stopping scan"
                        );
                        return Err(failure);
                    }
                }
            }
        }

        result.elapsed = started.elapsed();

        if let Err(err) = sink.finish(&result) {
            warn!(error = %err, "Result sink failed to finish");
        }

        let stats = source.stats();
        info!(
            outcomes = result.len(),
            available = result.available().count(),
            interrupted = result.is_interrupted(),
            skipped_invalid = stats.invalid,
            skipped_duplicates = stats.duplicates,
            elapsed = ?result.elapsed,
            "Scan finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::rdap::testing::{test_bootstrap, ScriptedTransport};
    use crate::source::{GeneratorFault, GeneratorIter, GeneratorSource};
    use crate::types::TldSet;

    #[derive(Default)]
    struct CollectSink {
        domains: Vec<String>,
        finished: bool,
        stop_after: Option<(usize, StopSignal)>,
        fail_records: bool,
    }

    impl ResultSink for CollectSink {
        fn record(&mut self, outcome: &QueryOutcome) -> Result<(), DomainSeekerError> {
            self.domains.push(outcome.domain.clone());
            if let Some((count, stop)) = &self.stop_after {
                if self.domains.len() >= *count {
                    stop.raise();
                }
            }
            if self.fail_records {
                return Err(DomainSeekerError::sink("collect", "disk full"));
            }
            Ok(())
        }

        fn finish(&mut self, _result: &ScanResult) -> Result<(), DomainSeekerError> {
            self.finished = true;
            Ok(())
        }
    }

    fn scanner(transport: ScriptedTransport, tlds: &[&str]) -> Scanner<ScriptedTransport> {
        let config = ScanConfig::default()
            .with_tlds(TldSet::parse(tlds).unwrap())
            .with_delay(Duration::ZERO)
            .with_max_retries(1);
        Scanner::new(RdapClient::new(transport, test_bootstrap(&["com", "org"])), config)
    }

    fn statuses(result: &ScanResult) -> Vec<(String, DomainStatus, u32)> {
        result
            .iter()
            .map(|o| (o.domain.clone(), o.status, o.attempts))
            .collect()
    }

    #[tokio::test]
    async fn test_available_and_registered() {
        let transport = ScriptedTransport::new()
            .respond("example.com", vec![Ok(404)])
            .respond("zzqxw7.com", vec![Ok(200)]);
        let scanner = scanner(transport, &[".com"]);
        let mut source = GeneratorSource::from_names("list", vec!["example", "zzqxw7"]);
        let mut sink = CollectSink::default();

        let result = scanner.run(&mut source, &mut sink).await.unwrap();

        assert_eq!(
            statuses(&result),
            vec![
                ("example.com".to_string(), DomainStatus::Available, 1),
                ("zzqxw7.com".to_string(), DomainStatus::Registered, 1),
            ]
        );
        assert_eq!(result.completion, ScanCompletion::Completed);
        assert_eq!(sink.domains, vec!["example.com", "zzqxw7.com"]);
        assert!(sink.finished);
    }

    #[tokio::test]
    async fn test_outcome_order_is_name_major() {
        let transport = ScriptedTransport::new()
            .respond("a.com", vec![Ok(404)])
            .respond("a.org", vec![Ok(200)])
            .respond("b.com", vec![Ok(429)])
            .respond("b.org", vec![Ok(404)]);
        let scanner = scanner(transport, &["com", "org"]);
        let mut source = GeneratorSource::from_names("list", vec!["a", "b"]);

        let result = scanner
            .run(&mut source, &mut CollectSink::default())
            .await
            .unwrap();

        let domains: Vec<&str> = result.iter().map(|o| o.domain.as_str()).collect();
        assert_eq!(domains, vec!["a.com", "a.org", "b.com", "b.org"]);
        assert_eq!(result.outcomes[2].status, DomainStatus::Unknown);
        assert_eq!(result.outcomes[2].attempts, 2);
    }

    #[tokio::test]
    async fn test_unmapped_tld_fails_before_querying() {
        let scanner = scanner(ScriptedTransport::new(), &[".com", ".zz"]);
        let mut source = GeneratorSource::from_names("list", vec!["example"]);

        let failure = scanner
            .run(&mut source, &mut CollectSink::default())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, ScanStage::Configuration);
        assert!(failure.partial.is_empty());
        assert!(scanner.client().transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failing_before_first_yield() {
        let scanner = scanner(ScriptedTransport::new(), &[".com"]);
        let mut source = GeneratorSource::new("broken", || {
            let items = vec![Err(GeneratorFault::Failed("import error".to_string()))];
            Ok(Box::new(items.into_iter()) as GeneratorIter)
        });

        let failure = scanner
            .run(&mut source, &mut CollectSink::default())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, ScanStage::Configuration);
        assert!(failure.error.is_configuration());
        assert!(failure.partial.is_empty());
    }

    #[tokio::test]
    async fn test_generator_failing_mid_run_keeps_partial() {
        let transport = ScriptedTransport::new().respond("first.com", vec![Ok(404)]);
        let scanner = scanner(transport, &[".com"]);
        let mut source = GeneratorSource::new("flaky", || {
            let items = vec![
                Ok("first".to_string()),
                Err(GeneratorFault::Failed("connection reset".to_string())),
            ];
            Ok(Box::new(items.into_iter()) as GeneratorIter)
        });

        let failure = scanner
            .run(&mut source, &mut CollectSink::default())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, ScanStage::Source);
        assert_eq!(failure.partial.len(), 1);
        assert!(failure.to_string().contains("after 1 outcomes"));
    }

    #[tokio::test]
    async fn test_stop_signal_interrupts_between_candidates() {
        let transport = ScriptedTransport::new()
            .respond("a.com", vec![Ok(404)])
            .respond("a.org", vec![Ok(404)]);
        let stop = StopSignal::new();
        let scanner = scanner(transport, &["com", "org"]).with_stop_signal(stop.clone());
        let mut source = GeneratorSource::from_names("list", vec!["a", "b"]);
        let mut sink = CollectSink {
            stop_after: Some((1, stop)),
            ..Default::default()
        };

        let result = scanner.run(&mut source, &mut sink).await.unwrap();

        assert!(result.is_interrupted());
        assert_eq!(result.len(), 1);
        assert_eq!(scanner.client().transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_scan() {
        let transport = ScriptedTransport::new()
            .respond("a.com", vec![Ok(404)])
            .respond("b.com", vec![Ok(200)]);
        let scanner = scanner(transport, &["com"]);
        let mut source = GeneratorSource::from_names("list", vec!["a", "b"]);
        let mut sink = CollectSink {
            fail_records: true,
            ..Default::default()
        };

        let result = scanner.run(&mut source, &mut sink).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.completion, ScanCompletion::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_spaces_query_starts() {
        let transport = ScriptedTransport::new()
            .respond("a.com", vec![Ok(404)])
            .respond("b.com", vec![Ok(404)])
            .respond("c.com", vec![Ok(404)]);
        let config = ScanConfig::default()
            .with_tlds(TldSet::parse(&["com"]).unwrap())
            .with_delay(Duration::from_secs(3));
        let scanner = Scanner::new(RdapClient::new(transport, test_bootstrap(&["com"])), config);
        let mut source = GeneratorSource::from_names("list", vec!["a", "b", "c"]);

        let begin = Instant::now();
        let result = scanner
            .run(&mut source, &mut CollectSink::default())
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        // First query starts immediately; two more delays follow.
        assert!(begin.elapsed() >= Duration::from_secs(6));
        assert!(begin.elapsed() < Duration::from_secs(7));
    }
}
