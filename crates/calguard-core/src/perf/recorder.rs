use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use crate::config::PerfConfig;

use super::stats::{CallSample, OperationStats};

/// Number of duration samples kept per operation for aggregate stats.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;
/// Calls slower than this emit a warning.
pub const DEFAULT_SLOW_CALL_THRESHOLD: Duration = Duration::from_secs(5);
/// Number of samples returned in [`OperationStats::recent`].
pub const RECENT_CALLS: usize = 10;

#[derive(Debug, Default)]
struct OperationHistory {
    log: Vec<CallSample>,
    window: VecDeque<Duration>,
}

impl OperationHistory {
    fn push(&mut self, sample: CallSample, capacity: usize) {
        if self.window.len() == capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample.duration);
        self.log.push(sample);
    }

    fn stats(&self, operation: &str) -> OperationStats {
        if self.log.is_empty() || self.window.is_empty() {
            return OperationStats::empty(operation);
        }
        let total: Duration = self.window.iter().sum();
        let avg = total / self.window.len() as u32;
        let min = self.window.iter().min().copied().unwrap_or_default();
        let max = self.window.iter().max().copied().unwrap_or_default();
        let successes = self.log.iter().filter(|s| s.success).count();
        let start = self.log.len().saturating_sub(RECENT_CALLS);
        OperationStats {
            operation: operation.to_string(),
            call_count: self.log.len(),
            avg,
            min,
            max,
            success_rate: successes as f64 / self.log.len() as f64,
            recent: self.log[start..].to_vec(),
        }
    }
}

/// Thread-safe collector of call timings keyed by operation name.
///
/// A single mutex guards every operation's log and window, so readers never
/// observe a half-updated window.
#[derive(Debug)]
pub struct PerformanceRecorder {
    histories: Mutex<HashMap<String, OperationHistory>>,
    window_capacity: usize,
    slow_call_threshold: Duration,
}

impl Default for PerformanceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceRecorder {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_WINDOW_CAPACITY, DEFAULT_SLOW_CALL_THRESHOLD)
    }

    /// Recorder with a custom window size (at least 1) and slow-call threshold.
    pub fn with_settings(window_capacity: usize, slow_call_threshold: Duration) -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            window_capacity: window_capacity.max(1),
            slow_call_threshold,
        }
    }

    pub fn from_config(cfg: &PerfConfig) -> Self {
        let slow = Duration::try_from_secs_f64(cfg.slow_call_threshold_secs.max(0.0))
            .unwrap_or(DEFAULT_SLOW_CALL_THRESHOLD);
        Self::with_settings(cfg.window_capacity, slow)
    }

    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    pub fn slow_call_threshold(&self) -> Duration {
        self.slow_call_threshold
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OperationHistory>> {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Time `f`, record its outcome under `operation`, and return its result untouched.
    pub fn measure<T, E, F>(&self, operation: &str, f: F) -> Result<T, E>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        let error = result.as_ref().err().map(|e| e.to_string());
        self.record_sample(operation, elapsed, error);
        result
    }

    /// Record a call timed by the caller. `error` is `None` for a successful call.
    pub fn record_sample(&self, operation: &str, duration: Duration, error: Option<String>) {
        let success = error.is_none();
        tracing::debug!(
            operation,
            duration_secs = duration.as_secs_f64(),
            success,
            error = error.as_deref().unwrap_or(""),
            "measured call"
        );
        if duration > self.slow_call_threshold {
            tracing::warn!(
                operation,
                duration_secs = duration.as_secs_f64(),
                threshold_secs = self.slow_call_threshold.as_secs_f64(),
                "call took longer than expected"
            );
        }

        let sample = CallSample {
            timestamp: SystemTime::now(),
            duration,
            success,
            error,
        };
        let capacity = self.window_capacity;
        self.lock()
            .entry(operation.to_string())
            .or_default()
            .push(sample, capacity);
    }

    /// Statistics for one operation; zero-count stats if it was never recorded.
    pub fn record(&self, operation: &str) -> OperationStats {
        self.lock()
            .get(operation)
            .map(|h| h.stats(operation))
            .unwrap_or_else(|| OperationStats::empty(operation))
    }

    /// Statistics for every recorded operation, ordered by name.
    pub fn record_all(&self) -> BTreeMap<String, OperationStats> {
        self.lock()
            .iter()
            .map(|(name, h)| (name.clone(), h.stats(name)))
            .collect()
    }

    /// Clear one operation's history, or everything when `operation` is `None`.
    pub fn reset(&self, operation: Option<&str>) {
        let mut histories = self.lock();
        match operation {
            Some(name) => {
                histories.remove(name);
            }
            None => histories.clear(),
        }
    }

    /// True iff the windowed average for `operation` is strictly above `threshold`.
    pub fn exceeds_threshold(&self, operation: &str, threshold: Duration) -> bool {
        let stats = self.record(operation);
        !stats.is_empty() && stats.avg > threshold
    }
}
