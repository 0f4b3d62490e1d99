//! Bounded retries for a single candidate domain.
//!
//! Rate-limited and transient attempts are retried up to `max_retries`
//! extra times. Every attempt, first or retry, waits for its turn on the
//! shared [`Pacer`], so retries never bypass the inter-query delay.

use crate::error::DomainSeekerError;
use crate::pacing::Pacer;
use crate::protocols::rdap::{classify, RawResponse, RdapClient, RdapTransport};
use crate::scanner::StopSignal;
use crate::types::{CandidateDomain, DomainStatus, QueryOutcome};
use tracing::{debug, warn};

/// Result of driving one candidate to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempted {
    /// A final outcome was reached
    Finished(QueryOutcome),
    /// The stop signal was raised between attempts; nothing is recorded
    Cancelled { attempts: u32 },
}

/// Drives a candidate through query, classification and retries.
pub struct RetryController<'a, T> {
    client: &'a RdapClient<T>,
    max_retries: u32,
}

impl<'a, T: RdapTransport> RetryController<'a, T> {
    pub fn new(client: &'a RdapClient<T>, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    /// Query a candidate until it reaches a final status.
    ///
    /// Makes at most `max_retries + 1` requests. The stop signal is checked
    /// before every attempt, never during one.
    pub async fn execute(
        &self,
        candidate: &CandidateDomain,
        pacer: &mut Pacer,
        stop: &StopSignal,
    ) -> Result<Attempted, DomainSeekerError> {
        let fqdn = candidate.fqdn();
        let mut attempts: u32 = 0;

        loop {
            if stop.is_raised() {
                return Ok(Attempted::Cancelled { attempts });
            }
            pacer.wait_turn().await;
            if stop.is_raised() {
                return Ok(Attempted::Cancelled { attempts });
            }

            attempts += 1;
            let response = self.client.query(candidate).await?;
            let status = classify(&response);

            if status.is_terminal() {
                return Ok(Attempted::Finished(self.outcome(
                    candidate, status, &response, attempts,
                )));
            }

            if attempts > self.max_retries {
                warn!(
                    domain = %fqdn,
                    attempts,
                    last = ?response,
                    "Retries exhausted, marking as unknown"
                );
                return Ok(Attempted::Finished(self.outcome(
                    candidate,
                    DomainStatus::Unknown,
                    &response,
                    attempts,
                )));
            }

            match status {
                DomainStatus::RateLimited => {
                    warn!(domain = %fqdn, attempt = attempts, "Rate limited, will retry")
                }
                _ => debug!(
                    domain = %fqdn,
                    attempt = attempts,
                    error = %response.error_message().unwrap_or_default(),
                    "Transient failure, will retry"
                ),
            }
        }
    }

    fn outcome(
        &self,
        candidate: &CandidateDomain,
        status: DomainStatus,
        response: &RawResponse,
        attempts: u32,
    ) -> QueryOutcome {
        QueryOutcome {
            domain: candidate.fqdn(),
            tld: candidate.tld().as_str().to_string(),
            status,
            http_status: response.http_status(),
            attempts,
            error: response.error_message(),
        }
    }
}
