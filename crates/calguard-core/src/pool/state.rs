//! Pool bookkeeping guarded by the pool mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Slot<H> {
    handle: H,
    last_used: Instant,
    /// Insertion order; breaks ties between equal `last_used` values.
    seq: u64,
}

#[derive(Debug)]
pub(super) struct PoolState<H> {
    entries: HashMap<String, Slot<H>>,
    /// Per-key locks held while a handle for that key is being built.
    building: HashMap<String, Arc<Mutex<()>>>,
    pub(super) last_cleanup: Instant,
    next_seq: u64,
}

impl<H: Clone> PoolState<H> {
    pub(super) fn new(now: Instant) -> Self {
        Self {
            entries: HashMap::new(),
            building: HashMap::new(),
            last_cleanup: now,
            next_seq: 0,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Refresh `last_used` and return a clone of the handle, if cached.
    pub(super) fn touch(&mut self, key: &str, now: Instant) -> Option<H> {
        let slot = self.entries.get_mut(key)?;
        slot.last_used = slot.last_used.max(now);
        Some(slot.handle.clone())
    }

    pub(super) fn insert(&mut self, key: &str, handle: H, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key.to_string(),
            Slot {
                handle,
                last_used: now,
                seq,
            },
        );
    }

    pub(super) fn remove(&mut self, key: &str) -> Option<H> {
        self.entries.remove(key).map(|slot| slot.handle)
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict the least recently used entry; the earliest inserted wins ties.
    pub(super) fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| (slot.last_used, slot.seq))
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            tracing::debug!(key = %key, "evicted least recently used handle");
        }
    }

    /// Remove every entry idle for longer than `idle_timeout` and stamp the cleanup time.
    pub(super) fn purge_idle(&mut self, now: Instant, idle_timeout: Duration) {
        let before = self.entries.len();
        self.entries.retain(|key, slot| {
            let keep = now.saturating_duration_since(slot.last_used) <= idle_timeout;
            if !keep {
                tracing::debug!(key = %key, "purged idle handle");
            }
            keep
        });
        self.last_cleanup = now;
        tracing::debug!(
            purged = before - self.entries.len(),
            remaining = self.entries.len(),
            "pool cleanup finished"
        );
    }

    /// The build lock for `key`, created on first use.
    pub(super) fn build_lock(&mut self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.building.entry(key.to_string()).or_default())
    }

    /// Forget the build lock for `key` once no other caller is waiting on it.
    pub(super) fn release_build_lock(&mut self, key: &str, lock: &Arc<Mutex<()>>) {
        let idle = self
            .building
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, lock) && Arc::strong_count(lock) <= 2);
        if idle {
            self.building.remove(key);
        }
    }
}
