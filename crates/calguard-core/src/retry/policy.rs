use std::collections::BTreeSet;
use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::error::FailureKind;

/// Upper bound applied to the doubled wait of a quota-exceeded failure.
pub const QUOTA_DELAY_CAP: Duration = Duration::from_secs(60);

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with jitter and a per-kind retry set.
///
/// The policy is plain configuration: it is built once and shared by every
/// call site, and carries no state between invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: f64,
    jitter_fraction: f64,
    retryable: BTreeSet<FailureKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), 2.0, 0.1)
    }
}

impl RetryPolicy {
    /// Build a policy retrying the default transient kinds
    /// (`TransientNetwork`, `QuotaExceeded`).
    ///
    /// Out-of-range values are clamped: at least one attempt, a factor of at
    /// least 1.0, and a jitter fraction within `[0, 1]`.
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_factor: f64,
        jitter_fraction: f64,
    ) -> Self {
        let backoff_factor = if backoff_factor.is_finite() {
            backoff_factor.max(1.0)
        } else {
            1.0
        };
        let jitter_fraction = if jitter_fraction.is_finite() {
            jitter_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_factor,
            jitter_fraction,
            retryable: [FailureKind::TransientNetwork, FailureKind::QuotaExceeded]
                .into_iter()
                .collect(),
        }
    }

    /// Replace the set of kinds that trigger a retry.
    pub fn with_retryable(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn jitter_fraction(&self) -> f64 {
        self.jitter_fraction
    }

    pub fn retryable_kinds(&self) -> impl Iterator<Item = FailureKind> + '_ {
        self.retryable.iter().copied()
    }

    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Backoff before the attempt following failed attempt `attempt` (1-based):
    /// `initial_delay * backoff_factor^(attempt - 1)`, saturating at `Duration::MAX`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Base delay adjusted for the failure kind, before jitter.
    ///
    /// Quota failures wait twice as long, capped at [`QUOTA_DELAY_CAP`].
    pub fn unjittered_delay(&self, attempt: u32, kind: FailureKind) -> Duration {
        let base = self.base_delay(attempt);
        match kind {
            FailureKind::QuotaExceeded => base.saturating_mul(2).min(QUOTA_DELAY_CAP),
            _ => base,
        }
    }

    /// Decide whether failed attempt `attempt` (1-based) should be retried.
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        self.decide_with_rng(attempt, kind, &mut rand::thread_rng())
    }

    /// Same as [`RetryPolicy::decide`] with an explicit random source.
    pub fn decide_with_rng<R: Rng>(
        &self,
        attempt: u32,
        kind: FailureKind,
        rng: &mut R,
    ) -> RetryDecision {
        if attempt >= self.max_attempts || !self.is_retryable(kind) {
            return RetryDecision::NoRetry;
        }
        let delay = self.unjittered_delay(attempt, kind);
        RetryDecision::RetryAfter(self.apply_jitter(delay, rng))
    }

    fn apply_jitter<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        if self.jitter_fraction <= 0.0 || delay.is_zero() {
            return delay;
        }
        let j = self.jitter_fraction;
        let factor = 1.0 + rng.gen_range(-j..=j);
        let secs = (delay.as_secs_f64() * factor).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        let initial = Duration::try_from_secs_f64(cfg.initial_delay_secs.max(0.0))
            .unwrap_or(Duration::ZERO);
        RetryPolicy::new(
            cfg.max_attempts,
            initial,
            cfg.backoff_factor,
            cfg.jitter_fraction,
        )
        .with_retryable(cfg.retryable.iter().copied())
    }
}
