use std::{future::Future, time::Duration};
use tokio::time::sleep;

/// Fixed-budget retry with linear backoff, shared by every retrying
/// operation of the drain workflow: status queries, admission changes and
/// migration issuance.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    backoff_unit: Duration,
}

impl RetryPolicy {
    /// A policy with the given attempt budget. The delay after the n'th
    /// failed attempt is `n * backoff_unit`.
    pub fn new(attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff_unit,
        }
    }

    /// A policy which retries back-to-back.
    pub fn no_backoff(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }

    /// Delay applied after the given 1-based failed attempt.
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted,
    /// returning the last error.
    pub async fn retry<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.retry_if(op, |_| true).await
    }

    /// Like [`RetryPolicy::retry`], but gives up immediately on errors the
    /// given predicate rejects.
    pub async fn retry_if<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(error) if attempt < self.attempts && retryable(&error) => {
                    tracing::warn!(%error, attempt, "Attempt failed, retrying");
                    sleep(self.delay(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
