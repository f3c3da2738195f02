//! `calguard backoff` – print the retry schedule of the configured policy.

use anyhow::Result;
use calguard_core::config::CalguardConfig;
use calguard_core::retry::RetryPolicy;
use calguard_core::FailureKind;
use std::time::Duration;

/// Unjittered waits after each failed attempt that would be retried.
/// Empty when `kind` is not retryable or only one attempt is allowed.
pub(crate) fn schedule(policy: &RetryPolicy, kind: FailureKind) -> Vec<Duration> {
    if !policy.is_retryable(kind) {
        return Vec::new();
    }
    (1..policy.max_attempts())
        .map(|attempt| policy.unjittered_delay(attempt, kind))
        .collect()
}

pub fn run_backoff(cfg: &CalguardConfig, kind: FailureKind) -> Result<()> {
    let policy = RetryPolicy::from(&cfg.retry);
    if !policy.is_retryable(kind) {
        println!("{kind} failures are not retried");
        return Ok(());
    }
    let waits = schedule(&policy, kind);
    println!(
        "{kind}: up to {} attempts, jitter ±{:.0}%",
        policy.max_attempts(),
        policy.jitter_fraction() * 100.0
    );
    println!("  {:>7}  {:>10}", "Attempt", "Wait(s)");
    println!("  {}  {}", "-------", "----------");
    for (i, wait) in waits.iter().enumerate() {
        println!("  {:>7}  {:>10.3}", i + 1, wait.as_secs_f64());
    }
    println!("  {:>7}  {:>10}", policy.max_attempts(), "give up");
    Ok(())
}
