//! End-to-end scans through the public API with an in-memory RDAP service.

use domain_seeker_lib::{
    builtin_generator, DomainSource, DomainStatus, FanoutSink, FileSource, GeneratorIter,
    GeneratorSource, NullSink, RdapBootstrap, RdapClient, RdapTransport, ResultsFileSink,
    ScanCompletion, ScanConfig, ScanStage, Scanner, StopSignal, TldSet, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio_test::assert_ok;

/// Answers by FQDN; unscripted names are registered (200).
#[derive(Default)]
struct FakeRegistry {
    script: Mutex<HashMap<String, VecDeque<u16>>>,
    requests: AtomicUsize,
}

impl FakeRegistry {
    fn with(self, fqdn: &str, statuses: &[u16]) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(fqdn.to_string(), statuses.iter().copied().collect());
        self
    }
}

impl RdapTransport for FakeRegistry {
    async fn get_status(&self, url: &str) -> Result<u16, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let fqdn = url.rsplit('/').next().unwrap_or_default();
        let mut script = self.script.lock().unwrap();
        let status = match script.get_mut(fqdn) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().copied().unwrap_or(200),
            None => 200,
        };
        Ok(status)
    }
}

fn scanner(registry: FakeRegistry, tlds: &[&str], max_retries: u32) -> Scanner<FakeRegistry> {
    let bootstrap = tlds.iter().fold(RdapBootstrap::empty(), |b, tld| {
        b.with_service(*tld, "https://rdap.test/")
    });
    let config = ScanConfig::default()
        .with_tlds(TldSet::parse(tlds).unwrap())
        .with_delay(Duration::ZERO)
        .with_max_retries(max_retries);
    Scanner::new(RdapClient::new(registry, Arc::new(bootstrap)), config)
}

fn domain_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_file_scan_classifies_and_skips_invalid() {
    let file = domain_file(&["example", "-bad-", "zzqxw7"]);
    let registry = FakeRegistry::default()
        .with("example.com", &[404])
        .with("zzqxw7.com", &[200]);
    let scanner = scanner(registry, &[".com"], 2);

    let mut source = FileSource::open(file.path()).unwrap();
    let result = assert_ok!(scanner.run(&mut source, &mut NullSink).await);

    let summary: Vec<_> = result
        .iter()
        .map(|o| (o.domain.as_str(), o.status, o.attempts))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("example.com", DomainStatus::Available, 1),
            ("zzqxw7.com", DomainStatus::Registered, 1),
        ]
    );
    assert_eq!(result.completion, ScanCompletion::Completed);
    assert_eq!(source.stats().invalid, 1);
    assert_eq!(source.stats().valid, 2);
}

#[tokio::test]
async fn test_outcomes_follow_name_then_tld_order() {
    let file = domain_file(&["beta", "alpha"]);
    let scanner = scanner(FakeRegistry::default(), &["com", "org", "net"], 0);

    let mut source = FileSource::open(file.path()).unwrap();
    let result = assert_ok!(scanner.run(&mut source, &mut NullSink).await);

    let domains: Vec<_> = result.iter().map(|o| o.domain.as_str()).collect();
    assert_eq!(
        domains,
        vec!["beta.com", "beta.org", "beta.net", "alpha.com", "alpha.org", "alpha.net"]
    );
    assert_eq!(scanner.client().transport().requests.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_identical_responses_give_identical_results() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let registry = FakeRegistry::default()
            .with("one.com", &[404])
            .with("two.com", &[400]);
        let scanner = scanner(registry, &["com"], 1);
        let mut source = GeneratorSource::from_names("fixed", vec!["one", "two", "three"]);
        let result = assert_ok!(scanner.run(&mut source, &mut NullSink).await);
        runs.push(result.iter().map(|o| o.status).collect::<Vec<_>>());
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(
        runs[0],
        vec![
            DomainStatus::Available,
            DomainStatus::Invalid,
            DomainStatus::Registered
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_exhausts_retries() {
    let registry = FakeRegistry::default().with("busy.com", &[429]);
    let scanner = scanner(registry, &["com"], 3);

    let mut source = GeneratorSource::from_names("fixed", vec!["busy"]);
    let result = assert_ok!(scanner.run(&mut source, &mut NullSink).await);

    let outcome = &result.outcomes[0];
    assert_eq!(outcome.status, DomainStatus::Unknown);
    assert_eq!(outcome.attempts, 4);
    assert_eq!(outcome.http_status, Some(429));
}

#[tokio::test]
async fn test_generator_failing_at_start_is_configuration_failure() {
    let scanner = scanner(FakeRegistry::default(), &["com"], 2);
    let mut source = GeneratorSource::new("broken", || -> Result<GeneratorIter, String> {
        Err("no names today".to_string())
    });

    let failure = scanner.run(&mut source, &mut NullSink).await.unwrap_err();
    assert_eq!(failure.stage, ScanStage::Configuration);
    assert!(failure.partial.is_empty());
    assert!(failure.error.is_configuration());
}

#[tokio::test]
async fn test_unmapped_tld_fails_before_querying() {
    let registry = FakeRegistry::default();
    let config = ScanConfig::default()
        .with_tlds(TldSet::parse(&["com", "zz"]).unwrap())
        .with_delay(Duration::ZERO);
    let bootstrap = RdapBootstrap::empty().with_service("com", "https://rdap.test/");
    let scanner = Scanner::new(RdapClient::new(registry, Arc::new(bootstrap)), config);

    let mut source = GeneratorSource::from_names("fixed", vec!["name"]);
    let failure = scanner.run(&mut source, &mut NullSink).await.unwrap_err();

    assert_eq!(failure.stage, ScanStage::Configuration);
    assert_eq!(scanner.client().transport().requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pattern_generator_with_results_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");
    let tlds = TldSet::parse(&["io"]).unwrap();

    let registry = FakeRegistry::default()
        .with("q3.io", &[404])
        .with("q7.io", &[503, 404]);
    let scanner = scanner(registry, &["io"], 2);

    let mut source = builtin_generator(r"pattern:q\d").unwrap();
    let mut sink = FanoutSink::new().with_sink(ResultsFileSink::create(&path, &tlds).unwrap());
    let result = assert_ok!(scanner.run(&mut source, &mut sink).await);

    assert_eq!(result.len(), 10);
    let available: Vec<_> = result.available().map(|o| o.domain.as_str()).collect();
    assert_eq!(available, vec!["q3.io", "q7.io"]);

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("q3.io"));
    assert!(written.contains("q7.io"));
    assert!(!written.contains("q4.io"));
    assert!(written.contains("# Checked: 10"));
    assert!(written.contains("# Available: 2"));
}

#[tokio::test]
async fn test_stop_before_run_returns_empty_interrupted_result() {
    let stop = StopSignal::new();
    stop.raise();
    let scanner = scanner(FakeRegistry::default(), &["com"], 2).with_stop_signal(stop);

    let mut source = GeneratorSource::from_names("fixed", vec!["never"]);
    let result = assert_ok!(scanner.run(&mut source, &mut NullSink).await);

    assert!(result.is_empty());
    assert!(result.is_interrupted());
}
