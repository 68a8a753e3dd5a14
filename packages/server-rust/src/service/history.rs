//! Bounded FIFO of recently routed envelopes and their results.
//!
//! Append and eviction happen under one `parking_lot::Mutex` critical section,
//! so concurrent writers can neither exceed the capacity nor lose entries.

use std::collections::VecDeque;

use esb_core::{InboundEnvelope, RoutingResult};
use parking_lot::Mutex;
use serde::Serialize;

/// One routed envelope, as submitted, with the result it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub message: InboundEnvelope,
    pub result: RoutingResult,
}

#[derive(Debug)]
struct Inner {
    entries: VecDeque<HistoryEntry>,
    recorded: u64,
}

/// Capacity-bounded history; the oldest entry is evicted first.
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl HistoryBuffer {
    /// Creates an empty buffer. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                recorded: 0,
            }),
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn record(&self, message: InboundEnvelope, result: RoutingResult) {
        let mut inner = self.inner.lock();
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(HistoryEntry { message, result });
        inner.recorded += 1;
    }

    /// The most recent `limit` entries, oldest first. `limit` is clamped to the capacity.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let inner = self.inner.lock();
        let take = limit.min(inner.entries.len());
        inner
            .entries
            .iter()
            .skip(inner.entries.len() - take)
            .cloned()
            .collect()
    }

    /// Number of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total entries ever recorded, including evicted ones.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.inner.lock().recorded
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use esb_core::Payload;
    use serde_json::json;

    use super::*;

    fn envelope(n: usize) -> InboundEnvelope {
        let mut payload = Payload::new();
        payload.insert("n".to_string(), json!(n));
        InboundEnvelope::new("test", "user-service", "user.create", payload)
    }

    fn seq(entry: &HistoryEntry) -> u64 {
        entry.message.payload.as_ref().unwrap()["n"].as_u64().unwrap()
    }

    #[test]
    fn keeps_most_recent_hundred_of_one_fifty() {
        let history = HistoryBuffer::new(100);
        for n in 0..150 {
            history.record(envelope(n), RoutingResult::success("ok"));
        }

        assert_eq!(history.len(), 100);
        assert_eq!(history.total_recorded(), 150);

        let all = history.recent(100);
        let seen: Vec<u64> = all.iter().map(seq).collect();
        let expected: Vec<u64> = (50..150).collect();
        assert_eq!(seen, expected);
        assert!(seen.iter().all(|n| *n >= 50));
    }

    #[test]
    fn recent_returns_tail_oldest_first() {
        let history = HistoryBuffer::new(100);
        for n in 0..20 {
            history.record(envelope(n), RoutingResult::success("ok"));
        }
        let last = history.recent(10);
        let seen: Vec<u64> = last.iter().map(seq).collect();
        assert_eq!(seen, (10..20).collect::<Vec<u64>>());
    }

    #[test]
    fn limit_is_clamped() {
        let history = HistoryBuffer::new(5);
        for n in 0..3 {
            history.record(envelope(n), RoutingResult::success("ok"));
        }
        assert_eq!(history.recent(1_000).len(), 3);
        assert!(history.recent(0).is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let history = HistoryBuffer::new(0);
        assert_eq!(history.capacity(), 1);
        history.record(envelope(1), RoutingResult::success("ok"));
        history.record(envelope(2), RoutingResult::success("ok"));
        assert_eq!(seq(&history.recent(10)[0]), 2);
    }

    #[test]
    fn concurrent_writers_never_exceed_capacity() {
        let history = Arc::new(HistoryBuffer::new(100));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let history = Arc::clone(&history);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        history.record(envelope(t * 1000 + n), RoutingResult::error("x"));
                        assert!(history.len() <= 100);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.len(), 100);
        assert_eq!(history.total_recorded(), 400);
    }
}
