//! Core data types for domain scanning.
//!
//! This module defines the values that flow through the engine: validated
//! base names and TLDs, the candidate domains built from them, per-domain
//! outcomes and the aggregate scan result.

use crate::error::DomainSeekerError;
use crate::utils::{base_name_rejection, is_valid_base_name, is_valid_tld_labels};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A validated domain label without its TLD (e.g. `example`).
///
/// Always lowercase ASCII letters, digits and inner hyphens, 1-63 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BaseName(String);

impl BaseName {
    /// Normalize (trim, lowercase) and validate a raw base name.
    pub fn parse(raw: &str) -> Result<Self, DomainSeekerError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if is_valid_base_name(&normalized) {
            Ok(Self(normalized))
        } else {
            let reason = base_name_rejection(&normalized);
            Err(DomainSeekerError::invalid_domain(normalized, reason))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A top-level domain, stored with its leading dot (e.g. `.com`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tld(String);

impl Tld {
    /// Parse `com`, `.com` or `.CO.UK` into a normalized TLD.
    pub fn parse(raw: &str) -> Result<Self, DomainSeekerError> {
        let trimmed = raw.trim().to_ascii_lowercase();
        let labels = trimmed.strip_prefix('.').unwrap_or(&trimmed);

        if !is_valid_tld_labels(labels) {
            return Err(DomainSeekerError::config(format!(
                "invalid TLD '{}'",
                raw.trim()
            )));
        }

        Ok(Self(format!(".{}", labels)))
    }

    /// The TLD including its leading dot (`.com`).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The TLD without its leading dot (`com`), as used by bootstrap tables.
    pub fn label(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for Tld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered, deduplicated set of TLDs for one scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TldSet(Vec<Tld>);

impl TldSet {
    /// Parse a list of TLD strings, keeping first-seen order and dropping duplicates.
    ///
    /// An empty list is a configuration error.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, DomainSeekerError> {
        let mut tlds: Vec<Tld> = Vec::with_capacity(raw.len());
        for item in raw {
            let tld = Tld::parse(item.as_ref())?;
            if !tlds.contains(&tld) {
                tlds.push(tld);
            }
        }

        if tlds.is_empty() {
            return Err(DomainSeekerError::config("TLD list is empty"));
        }

        Ok(Self(tlds))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tld> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Tld] {
        &self.0
    }
}

impl fmt::Display for TldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(Tld::as_str).collect();
        f.write_str(&joined.join(", "))
    }
}

/// A base name joined with one TLD. Lives only for the duration of its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDomain {
    base: BaseName,
    tld: Tld,
}

impl CandidateDomain {
    pub fn new(base: BaseName, tld: Tld) -> Self {
        Self { base, tld }
    }

    pub fn base(&self) -> &BaseName {
        &self.base
    }

    pub fn tld(&self) -> &Tld {
        &self.tld
    }

    /// Fully qualified name, e.g. `example.com`.
    pub fn fqdn(&self) -> String {
        format!("{}{}", self.base, self.tld)
    }
}

impl fmt::Display for CandidateDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.tld)
    }
}

/// Classification of one RDAP attempt or of a final outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// RDAP answered 404: nobody holds the name
    Available,
    /// RDAP answered 200 or 401
    Registered,
    /// RDAP rejected the request as malformed (400)
    Invalid,
    /// RDAP answered 429
    RateLimited,
    /// Any other status, or a transport failure
    TransientError,
    /// Retries ran out on a rate-limited or transient attempt
    Unknown,
}

impl DomainStatus {
    /// Terminal statuses end a domain's attempts immediately.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Available | Self::Registered | Self::Invalid)
    }

    /// Statuses that consume retry budget.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientError)
    }

    /// Short lowercase label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Registered => "registered",
            Self::Invalid => "invalid",
            Self::RateLimited => "rate_limited",
            Self::TransientError => "transient_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Registered => write!(f, "Registered"),
            Self::Invalid => write!(f, "Invalid"),
            Self::RateLimited => write!(f, "Rate limited"),
            Self::TransientError => write!(f, "Transient error"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Final result for one candidate domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    /// The domain that was checked (e.g. "example.com")
    pub domain: String,

    /// The TLD the domain was expanded with (e.g. ".com")
    pub tld: String,

    /// Final classification
    pub status: DomainStatus,

    /// HTTP status of the last attempt, if the server answered at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    /// Number of RDAP requests issued for this domain
    pub attempts: u32,

    /// Error message of the last attempt, for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn is_available(&self) -> bool {
        self.status == DomainStatus::Available
    }
}

/// How a scan run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanCompletion {
    /// The domain source was exhausted
    Completed,
    /// The stop signal was raised before the source was exhausted
    Interrupted,
}

/// Ordered outcomes of one scan run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Outcomes in query order
    pub outcomes: Vec<QueryOutcome>,

    /// Whether the run completed or was interrupted
    pub completion: ScanCompletion,

    /// Wall-clock duration of the run
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ScanResult {
    pub(crate) fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            completion: ScanCompletion::Completed,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn push(&mut self, outcome: QueryOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryOutcome> {
        self.outcomes.iter()
    }

    /// Outcomes classified as available, in query order.
    pub fn available(&self) -> impl Iterator<Item = &QueryOutcome> {
        self.outcomes.iter().filter(|o| o.is_available())
    }

    pub fn is_interrupted(&self) -> bool {
        self.completion == ScanCompletion::Interrupted
    }
}

/// Settings consumed by the scanner.
///
/// This is the already-validated input the engine works from; parsing of
/// files, flags and environment happens in [`crate::config`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// TLDs each base name is expanded with, in query order
    pub tlds: TldSet,

    /// Minimum spacing between the starts of two successive RDAP requests
    pub delay: Duration,

    /// Additional attempts allowed after a rate-limited or transient attempt
    pub max_retries: u32,

    /// Timeout for each individual RDAP request
    pub request_timeout: Duration,

    /// User-Agent header sent to RDAP servers
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tlds: TldSet(vec![
                Tld(".com".to_string()),
                Tld(".org".to_string()),
                Tld(".net".to_string()),
            ]),
            delay: Duration::from_secs(1),
            max_retries: 2,
            request_timeout: Duration::from_secs(10),
            user_agent: format!("domain-seeker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ScanConfig {
    /// Set the TLDs to expand base names with.
    pub fn with_tlds(mut self, tlds: TldSet) -> Self {
        self.tlds = tlds;
        self
    }

    /// Set the inter-query delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
