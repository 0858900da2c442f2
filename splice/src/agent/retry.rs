use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;

use crate::error::{Result, SpliceError};

/// Bounded-attempt exponential backoff with jitter for capacity/rate-limit
/// signals from the reasoning service. Any other error is returned
/// immediately.
#[derive(Debug, Clone)]
pub struct CapacityRetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for CapacityRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl CapacityRetryPolicy {
    fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoff {
            initial_interval: self.initial_delay,
            max_interval: self.max_delay,
            multiplier: 2.0,
            randomization_factor: 0.5,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `op`, retrying on `LlmRateLimit` until the policy's attempts are
/// exhausted. Exhaustion returns the last rate-limit error so the caller can
/// degrade to a well-formed "at capacity" answer.
pub async fn with_capacity_retry<T, Op, Fut>(policy: &CapacityRetryPolicy, mut op: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = policy.backoff();
    let mut last_error: Option<SpliceError> = None;

    for attempt in 1..=policy.max_attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error @ SpliceError::LlmRateLimit { .. }) => {
                let retry_after = match &error {
                    SpliceError::LlmRateLimit { retry_after } => *retry_after,
                    _ => None,
                };
                last_error = Some(error);

                if attempt == policy.max_attempts.max(1) {
                    break;
                }

                let delay = match retry_after {
                    Some(secs) => Duration::from_secs(secs).min(policy.max_delay),
                    None => backoff.next_backoff().unwrap_or(policy.max_delay),
                };
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Reasoning service at capacity, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(other) => return Err(other),
        }
    }

    tracing::error!(
        attempts = policy.max_attempts,
        "Capacity retries exhausted for reasoning call"
    );
    Err(last_error.unwrap_or(SpliceError::LlmRateLimit { retry_after: None }))
}
