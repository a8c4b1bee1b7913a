//! The single place that decides between retrying a failure and surfacing it.

use std::future::Future;

use crate::error::InsightsError;

/// Chooses whether a failed operation is run again.
pub trait RetryPolicy: Send + Sync {
    /// `attempt` counts retries already made for this operation, starting at 0.
    fn should_retry(&self, error: &InsightsError, attempt: u32) -> bool;
}

/// Retries every error tagged retryable, immediately, optionally up to a cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRetry {
    pub max_retries: Option<u32>,
}

impl ImmediateRetry {
    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    pub fn capped(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }
}

impl RetryPolicy for ImmediateRetry {
    fn should_retry(&self, error: &InsightsError, attempt: u32) -> bool {
        error.is_retryable() && self.max_retries.map_or(true, |max| attempt < max)
    }
}

/// Runs `op` until it succeeds or `policy` refuses another attempt.
///
/// Each attempt re-executes the whole operation, including its request.
pub async fn with_retry<P, F, Fut, T>(policy: &P, mut op: F) -> Result<T, InsightsError>
where
    P: RetryPolicy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InsightsError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if policy.should_retry(&err, attempt) => {
                attempt += 1;
                tracing::debug!(attempt, error = %err, "retrying");
            }
            Err(err) if err.is_retryable() && attempt > 0 => {
                return Err(InsightsError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
