//! Retry loop: run a closure until success or policy says stop.

use std::fmt;
use std::time::Duration;

use crate::error::Categorized;

use super::policy::{RetryDecision, RetryPolicy};

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, blocks the thread for the backoff duration then tries again.
///
/// The last failure is returned unchanged once attempts are exhausted.
pub fn run_with_retry<T, E, F>(policy: &RetryPolicy, operation: &str, f: F) -> Result<T, E>
where
    E: Categorized + fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    run_with_retry_using(policy, operation, std::thread::sleep, f)
}

/// Like [`run_with_retry`], but waits through `sleep` instead of `std::thread::sleep`.
pub fn run_with_retry_using<T, E, F, S>(
    policy: &RetryPolicy,
    operation: &str,
    mut sleep: S,
    mut f: F,
) -> Result<T, E>
where
    E: Categorized + fmt::Display,
    F: FnMut() -> Result<T, E>,
    S: FnMut(Duration),
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                let kind = e.kind();
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        if policy.is_retryable(kind) && attempt > 1 {
                            tracing::error!(
                                operation,
                                attempts = attempt,
                                kind = %kind,
                                error = %e,
                                "giving up after exhausting retries"
                            );
                        }
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(wait) => {
                        tracing::warn!(
                            operation,
                            attempt,
                            max_attempts = policy.max_attempts(),
                            wait_secs = wait.as_secs_f64(),
                            kind = %kind,
                            error = %e,
                            "operation failed, retrying"
                        );
                        sleep(wait);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
