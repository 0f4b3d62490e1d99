//! RDAP (Registration Data Access Protocol) query client.
//!
//! The client issues exactly one GET per call and reports either the HTTP
//! status code or a transport failure. Response bodies are never read;
//! availability is decided from the status code alone by [`classify`].

use crate::error::DomainSeekerError;
use crate::protocols::registry::RdapBootstrap;
use crate::types::{CandidateDomain, DomainStatus};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Media type requested from RDAP servers.
pub const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// Category of a failed request that never produced an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// A request that failed below HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new<M: Into<String>>(kind: TransportErrorKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout<M: Into<String>>(message: M) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect<M: Into<String>>(message: M) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Timeout => write!(f, "timed out: {}", self.message),
            TransportErrorKind::Connect => write!(f, "connection failed: {}", self.message),
            TransportErrorKind::Other => write!(f, "request failed: {}", self.message),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// What one RDAP attempt returned, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    Status(u16),
    Transport(TransportError),
}

impl RawResponse {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Transport(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Status(code) => match classify(self) {
                DomainStatus::RateLimited => Some(format!("rate limited (HTTP {})", code)),
                DomainStatus::TransientError => Some(format!("unexpected HTTP {}", code)),
                _ => None,
            },
            Self::Transport(err) => Some(err.to_string()),
        }
    }
}

/// Map one raw response to a status.
///
/// `Unknown` is never produced here; it is assigned by the retry controller
/// once the retry budget is spent.
pub fn classify(response: &RawResponse) -> DomainStatus {
    match response {
        RawResponse::Status(404) => DomainStatus::Available,
        RawResponse::Status(200) | RawResponse::Status(401) => DomainStatus::Registered,
        RawResponse::Status(400) => DomainStatus::Invalid,
        RawResponse::Status(429) => DomainStatus::RateLimited,
        RawResponse::Status(_) | RawResponse::Transport(_) => DomainStatus::TransientError,
    }
}

/// The HTTP seam of the query client.
///
/// Implementations perform a single GET and report the status code.
pub trait RdapTransport: Send + Sync {
    fn get_status(&self, url: &str) -> impl Future<Output = Result<u16, TransportError>> + Send;
}

/// [`RdapTransport`] backed by `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the given per-request timeout and User-Agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, DomainSeekerError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(RDAP_MEDIA_TYPE));

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                DomainSeekerError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self { http_client })
    }

    /// The underlying client, for reuse by the bootstrap fetch.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

impl RdapTransport for HttpTransport {
    async fn get_status(&self, url: &str) -> Result<u16, TransportError> {
        let response = self.http_client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// RDAP query client: endpoint lookup plus one request per call.
pub struct RdapClient<T> {
    transport: T,
    bootstrap: Arc<RdapBootstrap>,
}

impl<T: RdapTransport> RdapClient<T> {
    pub fn new(transport: T, bootstrap: Arc<RdapBootstrap>) -> Self {
        Self {
            transport,
            bootstrap,
        }
    }

    pub fn bootstrap(&self) -> &RdapBootstrap {
        &self.bootstrap
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue a single RDAP lookup for a candidate.
    ///
    /// Only a missing endpoint is an error here; anything the network does
    /// is reported inside [`RawResponse`].
    pub async fn query(&self, candidate: &CandidateDomain) -> Result<RawResponse, DomainSeekerError> {
        let fqdn = candidate.fqdn();
        let url = self
            .bootstrap
            .domain_url(candidate.tld(), &fqdn)
            .ok_or_else(|| {
                DomainSeekerError::bootstrap(
                    candidate.tld().as_str(),
                    "No known RDAP endpoint for TLD",
                )
            })?;

        debug!(domain = %fqdn, %url, "RDAP request");

        let response = match self.transport.get_status(&url).await {
            Ok(code) => RawResponse::Status(code),
            Err(err) => RawResponse::Transport(err),
        };

        debug!(domain = %fqdn, ?response, "RDAP response");
        Ok(response)
    }
}
