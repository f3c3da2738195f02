//! Composition of retry, measurement and pooling around provider calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::batch::{run_batch, BatchOptions};
use crate::config::CalguardConfig;
use crate::error::CalendarResult;
use crate::perf::{PerformanceRecorder, PerformanceReport, DEFAULT_REPORT_THRESHOLD};
use crate::pool::{ResourcePool, SharedPool};
use crate::retry::{run_with_retry, RetryPolicy};

use super::{CalendarEvent, CalendarProvider, Operation};

/// Builds a provider client (e.g. authenticates and constructs an API handle).
pub type ProviderFactory<P> = Arc<dyn Fn() -> CalendarResult<Arc<P>> + Send + Sync>;

/// Calls a provider through retry(measure(pooled client)).
///
/// Retry sits outside measurement, so every attempt is a separate sample and
/// the recorder's success rate reflects individual upstream calls. The client
/// is fetched from the pool inside the measured region: a slow or failing
/// construction shows up in the stats and is retried like any other call.
pub struct Invoker<P> {
    key: String,
    factory: ProviderFactory<P>,
    pool: SharedPool<Arc<P>>,
    recorder: Arc<PerformanceRecorder>,
    policy: RetryPolicy,
    batch: BatchOptions,
    report_threshold: Duration,
}

impl<P> fmt::Debug for Invoker<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl<P: CalendarProvider> Invoker<P> {
    /// Invoker for the client pooled under `key`, with default policies and
    /// a private pool and recorder.
    pub fn new(key: impl Into<String>, factory: ProviderFactory<P>) -> Self {
        Self {
            key: key.into(),
            factory,
            pool: Arc::new(ResourcePool::default()),
            recorder: Arc::new(PerformanceRecorder::new()),
            policy: RetryPolicy::default(),
            batch: BatchOptions::default(),
            report_threshold: DEFAULT_REPORT_THRESHOLD,
        }
    }

    /// Invoker with every policy taken from `cfg`.
    pub fn from_config(
        key: impl Into<String>,
        factory: ProviderFactory<P>,
        cfg: &CalguardConfig,
    ) -> Self {
        Self::new(key, factory)
            .with_pool(Arc::new(ResourcePool::from_config(&cfg.pool)))
            .with_recorder(Arc::new(PerformanceRecorder::from_config(&cfg.perf)))
            .with_policy(RetryPolicy::from(&cfg.retry))
            .with_batch_options(BatchOptions::from(&cfg.batch))
            .with_report_threshold(
                Duration::try_from_secs_f64(cfg.perf.report_threshold_secs.max(0.0))
                    .unwrap_or(DEFAULT_REPORT_THRESHOLD),
            )
    }

    /// Share a pool with other invokers (e.g. one per calendar id).
    pub fn with_pool(mut self, pool: SharedPool<Arc<P>>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<PerformanceRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_options(mut self, batch: BatchOptions) -> Self {
        self.batch = batch;
        self
    }

    /// Average duration above which [`Invoker::performance_report`] flags an operation.
    pub fn with_report_threshold(mut self, threshold: Duration) -> Self {
        self.report_threshold = threshold;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn recorder(&self) -> &Arc<PerformanceRecorder> {
        &self.recorder
    }

    pub fn pool(&self) -> &SharedPool<Arc<P>> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `f` against the pooled client under the retry and measurement layers.
    pub fn call<T, F>(&self, op: Operation, f: F) -> CalendarResult<T>
    where
        F: Fn(&P) -> CalendarResult<T>,
    {
        let name = op.as_str();
        run_with_retry(&self.policy, name, || {
            self.recorder.measure(name, || {
                let client = self.pool.get_or_create(&self.key, || (self.factory)())?;
                f(client.as_ref())
            })
        })
    }

    pub fn list_events(&self, start: &str, end: &str) -> CalendarResult<Vec<CalendarEvent>> {
        self.call(Operation::ListEvents, |p| p.list_events(start, end))
    }

    pub fn create_event(&self, event: &CalendarEvent) -> CalendarResult<CalendarEvent> {
        self.call(Operation::CreateEvent, |p| p.create_event(event))
    }

    pub fn update_event(&self, id: &str, event: &CalendarEvent) -> CalendarResult<CalendarEvent> {
        self.call(Operation::UpdateEvent, |p| p.update_event(id, event))
    }

    pub fn delete_event(&self, id: &str) -> CalendarResult<()> {
        self.call(Operation::DeleteEvent, |p| p.delete_event(id))
    }

    pub fn get_event(&self, id: &str) -> CalendarResult<Option<CalendarEvent>> {
        self.call(Operation::GetEvent, |p| p.get_event(id))
    }

    /// Create many events; a failed item yields `None` in its slot.
    pub fn create_events_batch(&self, events: &[CalendarEvent]) -> Vec<Option<CalendarEvent>> {
        run_batch(events, &self.batch, |ev| self.create_event(ev))
    }

    /// Apply `(id, event)` updates; a failed item yields `None` in its slot.
    pub fn update_events_batch(
        &self,
        updates: &[(String, CalendarEvent)],
    ) -> Vec<Option<CalendarEvent>> {
        run_batch(updates, &self.batch, |(id, ev)| self.update_event(id, ev))
    }

    /// Delete many events; `false` marks an id that could not be deleted.
    pub fn delete_events_batch(&self, ids: &[String]) -> Vec<bool> {
        run_batch(ids, &self.batch, |id| self.delete_event(id))
            .into_iter()
            .map(|r| r.is_some())
            .collect()
    }

    /// Fetch many events; missing or failed ids yield `None`.
    ///
    /// Reads pause half as long between chunks as writes do.
    pub fn get_events_batch(&self, ids: &[String]) -> Vec<Option<CalendarEvent>> {
        let options = self
            .batch
            .with_delay(self.batch.delay_between_batches / 2);
        run_batch(ids, &options, |id| self.get_event(id))
            .into_iter()
            .map(Option::flatten)
            .collect()
    }

    /// Drop the pooled client for this invoker's key, forcing a rebuild on next call.
    pub fn reset_client(&self) {
        self.pool.remove(&self.key);
    }

    /// Stats for every operation seen so far, with warnings and tuning suggestions.
    pub fn performance_report(&self) -> PerformanceReport {
        let pool = self.pool.stats();
        PerformanceReport::build(&self.recorder, Some(&pool), self.report_threshold)
    }
}
