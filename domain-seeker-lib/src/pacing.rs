//! Inter-query pacing.
//!
//! Successive RDAP requests are spaced so that at least `delay` passes
//! between the start of one request and the start of the next. The
//! arithmetic lives in [`pacing_wait`]; [`Pacer`] applies it with the tokio
//! clock.

use std::time::Duration;
use tokio::time::Instant;

/// How long to wait before the next request may start.
///
/// `since_last_start` is `None` before the first request of a run, which
/// never waits.
pub fn pacing_wait(delay: Duration, since_last_start: Option<Duration>) -> Duration {
    match since_last_start {
        Some(elapsed) => delay.saturating_sub(elapsed),
        None => Duration::ZERO,
    }
}

/// Tracks request starts and sleeps until the next one is due.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_start: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Time left before the next request may start.
    pub fn remaining(&self) -> Duration {
        pacing_wait(self.delay, self.last_start.map(|start| start.elapsed()))
    }

    /// Sleep until the next request may start, then mark it as started.
    pub async fn wait_turn(&mut self) {
        let wait = self.remaining();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.last_start = Some(Instant::now());
    }
}
