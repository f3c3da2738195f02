//! Performance report: per-operation stats plus warnings and tuning suggestions.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::pool::PoolStats;

use super::recorder::PerformanceRecorder;
use super::stats::OperationStats;

/// Average duration above which an operation is reported as slow.
pub const DEFAULT_REPORT_THRESHOLD: Duration = Duration::from_secs(3);
/// Success rates below this fraction get a suggestion.
pub const MIN_HEALTHY_SUCCESS_RATE: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub stats: BTreeMap<String, OperationStats>,
    /// One entry per operation whose windowed average exceeds the report threshold.
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// Size of the client pool, when one was inspected.
    pub pool_size: Option<usize>,
    pub generated_at: SystemTime,
}

impl PerformanceReport {
    /// Build a report from everything `recorder` has seen.
    ///
    /// Operations averaging above `threshold` get a warning and a suggestion;
    /// above the recorder's slow-call threshold the suggestion recommends
    /// batching instead. Success rates under [`MIN_HEALTHY_SUCCESS_RATE`] and
    /// an empty pool also produce suggestions.
    pub fn build(
        recorder: &PerformanceRecorder,
        pool: Option<&PoolStats>,
        threshold: Duration,
    ) -> Self {
        let stats = recorder.record_all();
        let very_slow = recorder.slow_call_threshold().max(threshold);

        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();
        for (name, s) in &stats {
            if recorder.exceeds_threshold(name, threshold) {
                warnings.push(format!(
                    "{name}: average duration exceeds {:.1}s",
                    threshold.as_secs_f64()
                ));
            }

            let avg = s.avg.as_secs_f64();
            if s.avg > very_slow {
                suggestions.push(format!(
                    "{name}: average duration {avg:.2}s is very slow; consider the batch helpers"
                ));
            } else if s.avg > threshold {
                suggestions.push(format!(
                    "{name}: average duration {avg:.2}s may need optimization"
                ));
            }

            if !s.is_empty() && s.success_rate < MIN_HEALTHY_SUCCESS_RATE {
                suggestions.push(format!(
                    "{name}: success rate {:.1}% is low; check error handling",
                    s.success_rate * 100.0
                ));
            }
        }

        if let Some(pool) = pool {
            if pool.size == 0 {
                suggestions
                    .push("client pool is empty; handles are not being reused".to_string());
            }
        }

        if !warnings.is_empty() {
            tracing::warn!(count = warnings.len(), "slow operations in performance report");
        }

        Self {
            stats,
            warnings,
            suggestions,
            pool_size: pool.map(|p| p.size),
            generated_at: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn pool_of(size: usize) -> PoolStats {
        PoolStats {
            size,
            max_size: 5,
            keys: (0..size).map(|i| format!("calendar:{i}")).collect(),
            last_cleanup: Instant::now(),
        }
    }

    #[test]
    fn healthy_operations_produce_no_findings() {
        let recorder = PerformanceRecorder::new();
        recorder.record_sample("list_events", Duration::from_millis(120), None);
        let report = PerformanceReport::build(&recorder, Some(&pool_of(1)), secs(3));
        assert!(report.warnings.is_empty());
        assert!(report.suggestions.is_empty());
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.pool_size, Some(1));
    }

    #[test]
    fn above_threshold_warns_and_suggests_optimization() {
        let recorder = PerformanceRecorder::new();
        recorder.record_sample("create_event", secs(4), None);
        let report = PerformanceReport::build(&recorder, None, secs(3));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("create_event"));
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("may need optimization"));
    }

    #[test]
    fn very_slow_operation_suggests_batching() {
        let recorder = PerformanceRecorder::new();
        recorder.record_sample("update_event", secs(6), None);
        let report = PerformanceReport::build(&recorder, None, secs(3));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("very slow"));
    }

    #[test]
    fn average_equal_to_threshold_is_not_slow() {
        let recorder = PerformanceRecorder::new();
        recorder.record_sample("get_event", secs(3), None);
        let report = PerformanceReport::build(&recorder, None, secs(3));
        assert!(report.warnings.is_empty());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn low_success_rate_is_flagged() {
        let recorder = PerformanceRecorder::new();
        for i in 0..10 {
            let error = (i < 2).then(|| "transient-network: reset".to_string());
            recorder.record_sample("delete_event", Duration::from_millis(10), error);
        }
        let report = PerformanceReport::build(&recorder, None, secs(3));
        assert!(report.warnings.is_empty());
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("80.0%"));
    }

    #[test]
    fn ninety_percent_success_is_healthy() {
        let recorder = PerformanceRecorder::new();
        for i in 0..10 {
            let error = (i == 0).then(|| "server-error: 503".to_string());
            recorder.record_sample("list_events", Duration::from_millis(10), error);
        }
        let report = PerformanceReport::build(&recorder, None, secs(3));
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn empty_pool_is_flagged_only_when_inspected() {
        let recorder = PerformanceRecorder::new();
        let report = PerformanceReport::build(&recorder, Some(&pool_of(0)), secs(3));
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].contains("pool is empty"));

        let report = PerformanceReport::build(&recorder, None, secs(3));
        assert!(report.suggestions.is_empty());
        assert_eq!(report.pool_size, None);
    }

    #[test]
    fn report_serializes_findings() {
        let recorder = PerformanceRecorder::new();
        recorder.record_sample("create_event", secs(4), Some("quota-exceeded: 429".into()));
        let report = PerformanceReport::build(&recorder, Some(&pool_of(2)), secs(3));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["create_event"]["call_count"], 1);
        assert_eq!(json["warnings"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["suggestions"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["pool_size"], 2);
    }
}
