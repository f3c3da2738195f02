//! Failure taxonomy shared by the retry, instrumentation and pool layers.
//!
//! Providers map whatever their transport reports into a [`CalendarError`]
//! tagged with a [`FailureKind`]. Everything downstream (retry decisions,
//! user-facing messages) dispatches on the kind, never on message text.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Closed set of failure categories a provider operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Connection reset, DNS failure, request timeout.
    TransientNetwork,
    /// Daily/project quota exhausted (HTTP 429 without a Retry-After hint).
    QuotaExceeded,
    /// Short-term rate limit with an explicit Retry-After hint.
    RateLimited,
    /// Credentials expired or were revoked (HTTP 401).
    AuthExpired,
    /// Caller lacks access to the calendar (HTTP 403).
    PermissionDenied,
    /// Upstream 5xx.
    ServerError,
    /// Event or calendar does not exist (HTTP 404).
    NotFound,
    /// Event data failed validation.
    InvalidData,
    /// Anything else the provider could not classify.
    GenericService,
}

impl FailureKind {
    pub const ALL: [FailureKind; 9] = [
        FailureKind::TransientNetwork,
        FailureKind::QuotaExceeded,
        FailureKind::RateLimited,
        FailureKind::AuthExpired,
        FailureKind::PermissionDenied,
        FailureKind::ServerError,
        FailureKind::NotFound,
        FailureKind::InvalidData,
        FailureKind::GenericService,
    ];

    /// Stable kebab-case name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::TransientNetwork => "transient-network",
            FailureKind::QuotaExceeded => "quota-exceeded",
            FailureKind::RateLimited => "rate-limited",
            FailureKind::AuthExpired => "auth-expired",
            FailureKind::PermissionDenied => "permission-denied",
            FailureKind::ServerError => "server-error",
            FailureKind::NotFound => "not-found",
            FailureKind::InvalidData => "invalid-data",
            FailureKind::GenericService => "generic-service",
        }
    }

    /// Parse the kebab-case name produced by [`FailureKind::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can report which [`FailureKind`] it belongs to.
///
/// The retry loop is generic over this trait so callers can keep their own
/// error types as long as they classify them.
pub trait Categorized {
    fn kind(&self) -> FailureKind;
}

/// Error returned by calendar provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct CalendarError {
    pub kind: FailureKind,
    /// Technical detail for logs; not meant for end users.
    pub detail: String,
    /// Server-provided hint for when the call may be retried.
    pub retry_after: Option<Duration>,
}

impl CalendarError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientNetwork, detail)
    }

    pub fn not_found(id: &str) -> Self {
        Self::new(FailureKind::NotFound, format!("event not found: {id}"))
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidData, detail)
    }
}

impl Categorized for CalendarError {
    fn kind(&self) -> FailureKind {
        self.kind
    }
}

/// Convenience alias used across the provider seams.
pub type CalendarResult<T> = Result<T, CalendarError>;
