//! Sample and aggregate types returned by the recorder.

use std::time::{Duration, SystemTime};

use serde::Serialize;

/// One measured call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSample {
    pub timestamp: SystemTime,
    pub duration: Duration,
    pub success: bool,
    /// Display form of the failure, if the call failed.
    pub error: Option<String>,
}

/// Aggregate view of one operation's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStats {
    pub operation: String,
    /// Calls recorded since the last reset (full log, not just the window).
    pub call_count: usize,
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Successful calls / `call_count`, in `[0, 1]`. Zero when nothing was recorded.
    pub success_rate: f64,
    /// Most recent samples, oldest first.
    pub recent: Vec<CallSample>,
}

impl OperationStats {
    /// Stats for an operation with no recorded calls.
    pub fn empty(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            call_count: 0,
            avg: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
            success_rate: 0.0,
            recent: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.call_count == 0
    }
}
