//! Classify upstream HTTP responses into failure kinds.

use std::time::Duration;

use crate::error::{CalendarError, FailureKind};

/// Classify an HTTP status code (plus any Retry-After hint) for retry decisions.
///
/// A 429 carrying a Retry-After hint is a short-term rate limit; without one
/// it is treated as quota exhaustion and gets the longer quota backoff.
pub fn classify_http_status(status: u16, retry_after: Option<Duration>) -> FailureKind {
    match status {
        401 => FailureKind::AuthExpired,
        403 => FailureKind::PermissionDenied,
        404 => FailureKind::NotFound,
        408 => FailureKind::TransientNetwork,
        429 if retry_after.is_some() => FailureKind::RateLimited,
        429 => FailureKind::QuotaExceeded,
        500..=599 => FailureKind::ServerError,
        _ => FailureKind::GenericService,
    }
}

/// Parse a Retry-After header given in delta-seconds. HTTP-date values are ignored.
pub fn parse_retry_after(header: &str) -> Option<Duration> {
    header.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Build a [`CalendarError`] for a failed HTTP response.
pub fn error_from_status(
    status: u16,
    retry_after_header: Option<&str>,
    detail: impl Into<String>,
) -> CalendarError {
    let retry_after = retry_after_header.and_then(parse_retry_after);
    let kind = classify_http_status(status, retry_after);
    let detail = format!("HTTP {status}: {}", detail.into());
    let err = CalendarError::new(kind, detail);
    match retry_after {
        Some(d) => err.with_retry_after(d),
        None => err,
    }
}
