//! Keyed cache of expensive handles (authenticated clients and the like).
//!
//! The pool bounds the number of live handles, evicts the least recently used
//! one when full, and periodically purges handles that sat idle for too long.
//! It is a plain constructed object; share it with `Arc` where needed.

mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::PoolConfig;

use state::PoolState;

pub const DEFAULT_MAX_SIZE: usize = 5;
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1800);

/// Snapshot of the pool's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub max_size: usize,
    /// Cached keys, sorted.
    pub keys: Vec<String>,
    pub last_cleanup: Instant,
}

/// Bounded, idle-evicting cache of handles keyed by string.
///
/// Handles are returned by clone, so `H` is usually an `Arc<Client>`.
#[derive(Debug)]
pub struct ResourcePool<H> {
    state: Mutex<PoolState<H>>,
    max_size: usize,
    cleanup_interval: Duration,
    idle_timeout: Duration,
}

impl<H: Clone> Default for ResourcePool<H> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_CLEANUP_INTERVAL, DEFAULT_IDLE_TIMEOUT)
    }
}

impl<H: Clone> ResourcePool<H> {
    /// Create a pool holding at most `max_size` handles (at least 1).
    pub fn new(max_size: usize, cleanup_interval: Duration, idle_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState::new(Instant::now())),
            max_size: max_size.max(1),
            cleanup_interval,
            idle_timeout,
        }
    }

    pub fn from_config(cfg: &PoolConfig) -> Self {
        Self::new(
            cfg.max_size,
            Duration::from_secs(cfg.cleanup_interval_secs),
            Duration::from_secs(cfg.idle_timeout_secs),
        )
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached handle for `key`, building it with `factory` on a miss.
    ///
    /// A freshly built handle is stamped with the clock reading taken after the
    /// factory returns, so entries touched during a slow build do not look
    /// more recent than it.
    pub fn get_or_create<E, F>(&self, key: &str, factory: F) -> Result<H, E>
    where
        F: FnOnce() -> Result<H, E>,
    {
        self.get_or_create_with_clock(key, Instant::now, factory)
    }

    /// [`ResourcePool::get_or_create`] with the clock reading supplied by the caller.
    ///
    /// Bookkeeping (cleanup check, lookup, eviction, insertion) happens under
    /// the pool lock. The factory runs outside it, serialized per key: callers
    /// racing on the same cold key wait for the first builder and reuse its
    /// handle, while other keys proceed. A failed build stores nothing and
    /// evicts nothing. The new handle is stamped with `now` itself.
    pub fn get_or_create_at<E, F>(&self, key: &str, now: Instant, factory: F) -> Result<H, E>
    where
        F: FnOnce() -> Result<H, E>,
    {
        self.get_or_create_with_clock(key, || now, factory)
    }

    fn get_or_create_with_clock<E, F, C>(&self, key: &str, clock: C, factory: F) -> Result<H, E>
    where
        F: FnOnce() -> Result<H, E>,
        C: Fn() -> Instant,
    {
        let now = clock();
        let build_lock = {
            let mut state = self.lock();
            if now.saturating_duration_since(state.last_cleanup) > self.cleanup_interval {
                state.purge_idle(now, self.idle_timeout);
            }
            if let Some(handle) = state.touch(key, now) {
                tracing::trace!(key, "reusing pooled handle");
                return Ok(handle);
            }
            state.build_lock(key)
        };

        let _building = build_lock.lock().unwrap_or_else(PoisonError::into_inner);

        {
            let mut state = self.lock();
            if let Some(handle) = state.touch(key, clock().max(now)) {
                state.release_build_lock(key, &build_lock);
                return Ok(handle);
            }
        }

        match factory() {
            Ok(handle) => {
                let built_at = clock().max(now);
                let mut state = self.lock();
                if state.len() >= self.max_size {
                    state.evict_lru();
                }
                state.insert(key, handle.clone(), built_at);
                state.release_build_lock(key, &build_lock);
                tracing::debug!(key, size = state.len(), "created pooled handle");
                Ok(handle)
            }
            Err(e) => {
                self.lock().release_build_lock(key, &build_lock);
                tracing::warn!(key, "failed to create pooled handle");
                Err(e)
            }
        }
    }

    /// Drop the handle for `key`, returning it if it was cached.
    pub fn remove(&self, key: &str) -> Option<H> {
        self.lock().remove(key)
    }

    /// Drop every cached handle.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.clear();
        tracing::info!("resource pool cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            size: state.len(),
            max_size: self.max_size,
            keys: state.keys(),
            last_cleanup: state.last_cleanup,
        }
    }
}

/// Pools are usually shared between threads.
pub type SharedPool<H> = Arc<ResourcePool<H>>;
