//! Reliability layer for calendar API providers: retry with backoff,
//! per-operation performance statistics, and a bounded client pool.

pub mod config;
pub mod logging;

pub mod batch;
pub mod calendar;
pub mod error;
pub mod messages;
pub mod perf;
pub mod pool;
pub mod retry;

pub use error::{CalendarError, CalendarResult, Categorized, FailureKind};
