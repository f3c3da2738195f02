//! Per-operation timing and outcome statistics.
//!
//! A [`PerformanceRecorder`] is constructed once and shared (behind an `Arc`)
//! by whatever wraps provider calls. Every measured call lands in an unbounded
//! log (used for call count and success rate) and in a fixed-capacity rolling
//! window of durations (used for average/min/max).

mod recorder;
mod report;
mod stats;

pub use recorder::{
    PerformanceRecorder, DEFAULT_SLOW_CALL_THRESHOLD, DEFAULT_WINDOW_CAPACITY, RECENT_CALLS,
};
pub use report::{PerformanceReport, DEFAULT_REPORT_THRESHOLD, MIN_HEALTHY_SUCCESS_RATE};
pub use stats::{CallSample, OperationStats};
