//! Chunked batch execution with an inter-chunk pause.
//!
//! Items are processed `batch_size` at a time; the items of one chunk run on
//! scoped worker threads and the caller sleeps between chunks to stay under
//! upstream rate limits. A failing item turns into `None` in the output and
//! never aborts the batch.

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::config::BatchConfig;

/// Chunking parameters for [`run_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub delay_between_batches: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            delay_between_batches: Duration::from_millis(200),
        }
    }
}

impl BatchOptions {
    pub fn new(batch_size: usize, delay_between_batches: Duration) -> Self {
        Self {
            batch_size,
            delay_between_batches,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_batches = delay;
        self
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(cfg: &BatchConfig) -> Self {
        Self::new(
            cfg.batch_size,
            Duration::from_millis(cfg.delay_between_batches_ms),
        )
    }
}

/// Apply `f` to every item, chunk by chunk. Output order matches input order.
pub fn run_batch<T, R, E, F>(items: &[T], options: &BatchOptions, f: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    E: fmt::Display + Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    run_batch_using(items, options, thread::sleep, f)
}

/// Like [`run_batch`], but pauses between chunks through `sleep`.
pub fn run_batch_using<T, R, E, F, S>(
    items: &[T],
    options: &BatchOptions,
    mut sleep: S,
    f: F,
) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    E: fmt::Display + Send,
    F: Fn(&T) -> Result<R, E> + Sync,
    S: FnMut(Duration),
{
    let batch_size = options.batch_size.max(1);
    let total_batches = items.len().div_ceil(batch_size);
    tracing::info!(
        items = items.len(),
        batches = total_batches,
        batch_size,
        "starting batch"
    );

    let f = &f;
    let mut results = Vec::with_capacity(items.len());
    for (batch_index, chunk) in items.chunks(batch_size).enumerate() {
        tracing::debug!(
            batch = batch_index + 1,
            total_batches,
            items = chunk.len(),
            "processing batch"
        );

        let chunk_results: Vec<Option<R>> = thread::scope(|scope| {
            let workers: Vec<_> = chunk
                .iter()
                .map(|item| scope.spawn(move || f(item)))
                .collect();
            workers
                .into_iter()
                .enumerate()
                .map(|(offset, worker)| {
                    let index = batch_index * batch_size + offset;
                    match worker.join() {
                        Ok(Ok(value)) => Some(value),
                        Ok(Err(e)) => {
                            tracing::warn!(index, error = %e, "batch item failed");
                            None
                        }
                        Err(_) => {
                            tracing::error!(index, "batch item panicked");
                            None
                        }
                    }
                })
                .collect()
        });
        results.extend(chunk_results);

        let more = (batch_index + 1) < total_batches;
        if more && !options.delay_between_batches.is_zero() {
            sleep(options.delay_between_batches);
        }
    }

    let failed = results.iter().filter(|r| r.is_none()).count();
    tracing::info!(results = results.len(), failed, "batch finished");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn failing_item_becomes_none() {
        let items = [1, 2, 3, 4, 5];
        let results = run_batch(&items, &BatchOptions::new(2, Duration::ZERO), |n| {
            if *n == 3 {
                Err(CalendarError::network("item 3 failed"))
            } else {
                Ok(n * 10)
            }
        });
        assert_eq!(results, vec![Some(10), Some(20), None, Some(40), Some(50)]);
    }

    #[test]
    fn sleeps_between_chunks_only() {
        let items: Vec<u32> = (0..25).collect();
        let calls = AtomicUsize::new(0);
        let mut pauses = Vec::new();
        let options = BatchOptions::new(10, Duration::from_millis(200));
        let results = run_batch_using(
            &items,
            &options,
            |d| pauses.push(d),
            |n| -> Result<u32, CalendarError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(*n)
            },
        );
        assert_eq!(results.len(), 25);
        assert_eq!(calls.load(Ordering::SeqCst), 25);
        assert_eq!(pauses, vec![Duration::from_millis(200); 2]);
        assert!(results.iter().enumerate().all(|(i, r)| *r == Some(i as u32)));
    }

    #[test]
    fn zero_batch_size_is_treated_as_one() {
        let items = ["a", "b"];
        let mut pauses = 0;
        let results = run_batch_using(
            &items,
            &BatchOptions::new(0, Duration::from_millis(1)),
            |_| pauses += 1,
            |s| -> Result<String, CalendarError> { Ok(s.to_uppercase()) },
        );
        assert_eq!(results, vec![Some("A".to_string()), Some("B".to_string())]);
        assert_eq!(pauses, 1);
    }

    #[test]
    fn empty_input() {
        let items: [u8; 0] = [];
        let results = run_batch(&items, &BatchOptions::default(), |n| {
            Ok::<_, CalendarError>(*n)
        });
        assert!(results.is_empty());
    }
}
