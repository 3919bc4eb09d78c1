//! Bounded-retry external-call primitive
//!
//! External child-process calls share one retry shape: a fixed attempt count,
//! a per-attempt deadline, and linearly increasing backoff between attempts.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

/// Attempts, backoff schedule, and per-attempt timeout for an external call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts before giving up
    pub attempts: u32,
    /// Base backoff; attempt `n` sleeps `backoff * n` before retrying
    pub backoff: Duration,
    /// Deadline applied to each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of an exhausted or timed-out retried call.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error> {
    /// The final attempt exceeded the per-attempt deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The final attempt failed
    #[error(transparent)]
    Inner(E),
}

/// Run `op` under `policy`, returning the first success or the last failure.
///
/// `what` labels the call in logs. Each attempt is individually bounded by
/// `policy.timeout`; a timed-out attempt is dropped (killing any child
/// process configured to die with its handle) and counts as a failure.
pub async fn bounded<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.attempts.max(1) {
        match timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(what, attempt, error = %e, "attempt failed");
                last_error = Some(RetryError::Inner(e));
            }
            Err(_) => {
                tracing::warn!(what, attempt, timeout = ?policy.timeout, "attempt timed out");
                last_error = Some(RetryError::Timeout(policy.timeout));
            }
        }

        if attempt < policy.attempts {
            sleep(policy.backoff * attempt).await;
        }
    }

    // attempts >= 1, so last_error is always set by the loop
    Err(last_error.unwrap_or(RetryError::Timeout(policy.timeout)))
}
