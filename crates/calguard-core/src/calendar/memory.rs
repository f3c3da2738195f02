//! In-process provider with scripted and random fault injection.
//!
//! Used by tests and by `calguard simulate` to exercise the reliability layer
//! without a network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::error::{CalendarError, CalendarResult, FailureKind};

use super::{CalendarEvent, CalendarProvider, Operation};

#[derive(Debug, Default)]
struct Inner {
    events: BTreeMap<String, CalendarEvent>,
    next_id: u64,
    scripted: HashMap<Operation, VecDeque<FailureKind>>,
    calls: HashMap<Operation, usize>,
}

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    inner: Mutex<Inner>,
    latency: Duration,
    failure_rate: f64,
    random_kind: Option<FailureKind>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail each call with probability `rate` (clamped to `[0, 1]`) using `kind`.
    pub fn with_random_failures(mut self, rate: f64, kind: FailureKind) -> Self {
        self.failure_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        self.random_kind = Some(kind);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `times` calls of `op` fail with `kind`.
    pub fn fail_next(&self, op: Operation, kind: FailureKind, times: usize) {
        let mut inner = self.lock();
        let queue = inner.scripted.entry(op).or_default();
        queue.extend(std::iter::repeat(kind).take(times));
    }

    /// Number of calls of `op` received so far, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count the call and return an injected failure, if one is due.
    fn enter(&self, op: Operation) -> CalendarResult<()> {
        let scripted = {
            let mut inner = self.lock();
            *inner.calls.entry(op).or_insert(0) += 1;
            inner.scripted.get_mut(&op).and_then(VecDeque::pop_front)
        };
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if let Some(kind) = scripted {
            return Err(CalendarError::new(kind, format!("injected failure in {op}")));
        }
        if let Some(kind) = self.random_kind {
            if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
                return Err(CalendarError::new(kind, format!("random failure in {op}")));
            }
        }
        Ok(())
    }
}

impl CalendarProvider for InMemoryProvider {
    fn list_events(&self, start: &str, end: &str) -> CalendarResult<Vec<CalendarEvent>> {
        self.enter(Operation::ListEvents)?;
        let inner = self.lock();
        let mut events: Vec<CalendarEvent> = inner
            .events
            .values()
            .filter(|ev| ev.overlaps(start, end))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(events)
    }

    fn create_event(&self, event: &CalendarEvent) -> CalendarResult<CalendarEvent> {
        self.enter(Operation::CreateEvent)?;
        event.validate()?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("evt-{}", inner.next_id);
        let mut stored = event.clone();
        stored.id = Some(id.clone());
        inner.events.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_event(&self, id: &str, event: &CalendarEvent) -> CalendarResult<CalendarEvent> {
        self.enter(Operation::UpdateEvent)?;
        event.validate()?;
        let mut inner = self.lock();
        let slot = inner
            .events
            .get_mut(id)
            .ok_or_else(|| CalendarError::not_found(id))?;
        let mut updated = event.clone();
        updated.id = Some(id.to_string());
        *slot = updated.clone();
        Ok(updated)
    }

    fn delete_event(&self, id: &str) -> CalendarResult<()> {
        self.enter(Operation::DeleteEvent)?;
        self.lock()
            .events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CalendarError::not_found(id))
    }

    fn get_event(&self, id: &str) -> CalendarResult<Option<CalendarEvent>> {
        self.enter(Operation::GetEvent)?;
        Ok(self.lock().events.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standup() -> CalendarEvent {
        CalendarEvent::new("Standup", "2024-05-01T09:00:00", "2024-05-01T09:15:00")
    }

    #[test]
    fn crud_roundtrip() {
        let provider = InMemoryProvider::new();
        let created = provider.create_event(&standup()).unwrap();
        let id = created.id.clone().unwrap();

        let fetched = provider.get_event(&id).unwrap().unwrap();
        assert_eq!(fetched, created);

        let mut changed = standup();
        changed.summary = "Daily sync".to_string();
        let updated = provider.update_event(&id, &changed).unwrap();
        assert_eq!(updated.summary, "Daily sync");
        assert_eq!(updated.id.as_deref(), Some(id.as_str()));

        provider.delete_event(&id).unwrap();
        assert!(provider.get_event(&id).unwrap().is_none());
        assert_eq!(
            provider.delete_event(&id).unwrap_err().kind,
            FailureKind::NotFound
        );
    }

    #[test]
    fn list_filters_and_orders_by_start() {
        let provider = InMemoryProvider::new();
        provider
            .create_event(&CalendarEvent::new("Late", "2024-05-01T15:00:00", "2024-05-01T16:00:00"))
            .unwrap();
        provider.create_event(&standup()).unwrap();
        provider
            .create_event(&CalendarEvent::new("Other day", "2024-05-03", "2024-05-04").all_day())
            .unwrap();

        let events = provider
            .list_events("2024-05-01T00:00:00", "2024-05-02T00:00:00")
            .unwrap();
        let names: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(names, vec!["Standup", "Late"]);
    }

    #[test]
    fn scripted_failures_are_consumed_in_order() {
        let provider = InMemoryProvider::new();
        provider.fail_next(Operation::GetEvent, FailureKind::TransientNetwork, 2);
        assert_eq!(
            provider.get_event("x").unwrap_err().kind,
            FailureKind::TransientNetwork
        );
        assert!(provider.get_event("x").is_err());
        assert!(provider.get_event("x").unwrap().is_none());
        assert_eq!(provider.calls(Operation::GetEvent), 3);
        assert_eq!(provider.calls(Operation::ListEvents), 0);
    }

    #[test]
    fn invalid_event_is_rejected() {
        let provider = InMemoryProvider::new();
        let err = provider
            .create_event(&CalendarEvent::new("", "2024-05-01", "2024-05-01"))
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidData);
        assert!(provider.is_empty());
    }

    #[test]
    fn certain_random_failure() {
        let provider =
            InMemoryProvider::new().with_random_failures(1.0, FailureKind::ServerError);
        assert_eq!(
            provider.list_events("a", "b").unwrap_err().kind,
            FailureKind::ServerError
        );
    }
}
