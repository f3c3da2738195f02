//! Retry and backoff policy.
//!
//! This module encapsulates the backoff schedule (exponential growth, quota
//! doubling, jitter), HTTP status classification, and the blocking retry loop
//! so that providers and the invoker share one consistent policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify_http_status, error_from_status, parse_retry_after};
pub use policy::{RetryDecision, RetryPolicy, QUOTA_DELAY_CAP};
pub use run::{run_with_retry, run_with_retry_using};
