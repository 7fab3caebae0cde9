// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded in-memory buffer for entries awaiting a flush.
//!
//! # Eviction Policy
//!
//! The queue is split in two:
//!
//! - a **pinned slot** holding the root entry. It is filled by the first
//!   submission and replaced whenever a different transaction is submitted.
//!   It never consumes tail capacity and is never evicted. Submitting the
//!   pinned transaction again appends it to the tail like any other entry.
//! - a **tail** of at most `max_items` entries in submission order. When an
//!   append pushes it over capacity the oldest tail entry is dropped.
//!
//! So the queue holds at most `max_items + 1` entries, and a burst of spans
//! can never push out the transaction that gives them context.
//!
//! ```text
//!   pinned     tail (FIFO, capped at max_items)
//!   ┌─────┐   ┌────┬────┬────┬─────┬────┐
//!   │ tx  │   │ s1 │ s2 │ s3 │ ... │ sN │ <- add_entry
//!   └─────┘   └────┴────┴────┴─────┴────┘
//!               │
//!               └─> evicted first
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::models::Entry;

/// Tail capacity used when none is configured.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Entries waiting for the next flush, bounded as described in the module
/// docs.
#[derive(Debug, Clone)]
pub struct BoundedQueue {
    pinned: Option<Entry>,
    tail: VecDeque<Entry>,
    max_items: usize,
    evicted: u64,
}

impl Default for BoundedQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

impl BoundedQueue {
    /// Creates an empty queue.
    ///
    /// # Arguments
    ///
    /// * `max_items` - Tail capacity. The pinned slot comes on top, so the
    ///   queue holds at most `max_items + 1` entries.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        BoundedQueue {
            pinned: None,
            tail: VecDeque::with_capacity(max_items.min(1_024)),
            max_items,
            evicted: 0,
        }
    }

    fn takes_pinned_slot(&self, entry: &Entry) -> bool {
        match &self.pinned {
            None => true,
            Some(pinned) => entry.is_root() && pinned.id() != entry.id(),
        }
    }

    /// Buffers `entry`.
    ///
    /// The entry takes the pinned slot when the slot is empty or when it is a
    /// transaction other than the pinned one; the previous occupant is
    /// replaced, not moved to the tail. Otherwise it is appended to the tail.
    ///
    /// # Error Handling
    ///
    /// Never fails. When the append pushes the tail past `max_items`, the
    /// oldest tail entry is dropped, counted in [`Self::evicted`] and logged
    /// at debug level.
    ///
    /// # Examples
    ///
    /// ```
    /// use logengine::queue::BoundedQueue;
    /// use logengine::{Span, Transaction};
    ///
    /// let mut queue = BoundedQueue::new(2);
    /// queue.add_entry(Transaction::new("GET /").into());
    /// for category in ["db", "cache", "http"] {
    ///     queue.add_entry(Span::new(category, None).into());
    /// }
    ///
    /// assert_eq!(queue.len(), 3);
    /// assert_eq!(queue.evicted(), 1);
    /// ```
    pub fn add_entry(&mut self, entry: Entry) {
        if self.takes_pinned_slot(&entry) {
            self.pinned = Some(entry);
            return;
        }

        self.tail.push_back(entry);
        if self.tail.len() > self.max_items {
            if let Some(dropped) = self.tail.pop_front() {
                self.evicted += 1;
                debug!(
                    "QUEUE | Tail full ({} items), dropping oldest {} {}",
                    self.max_items,
                    dropped.kind(),
                    dropped.id()
                );
            }
        }
    }

    /// Pinned entry first, then the tail in submission order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.pinned.iter().chain(self.tail.iter()).cloned().collect()
    }

    /// Empties the queue, returning its content in [`Self::entries`] order.
    pub fn take(&mut self) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(self.len());
        entries.extend(self.pinned.take());
        entries.extend(self.tail.drain(..));
        entries
    }

    /// Drops every entry. The eviction count is kept.
    pub fn clear(&mut self) {
        self.pinned = None;
        self.tail.clear();
    }

    /// The root entry, if one has been submitted since the last flush.
    #[must_use]
    pub fn pinned(&self) -> Option<&Entry> {
        self.pinned.as_ref()
    }

    /// # Returns
    ///
    /// The number of buffered entries, pinned slot included.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.pinned.is_some()) + self.tail.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pinned.is_none() && self.tail.is_empty()
    }

    /// Tail capacity given at construction.
    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Number of tail entries dropped by eviction since creation.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// A [`BoundedQueue`] behind a mutex, so that the check-append-evict sequence
/// of [`BoundedQueue::add_entry`] is one critical section.
#[derive(Debug, Default)]
pub struct SharedQueue {
    inner: Mutex<BoundedQueue>,
}

impl SharedQueue {
    /// Creates an empty queue with a tail capacity of `max_items`.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            inner: Mutex::new(BoundedQueue::new(max_items)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedQueue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`BoundedQueue::add_entry`].
    pub fn add_entry(&self, entry: Entry) {
        self.lock().add_entry(entry);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries()
    }

    /// Empties the queue in one critical section, returning its content.
    /// Entries added afterwards start the next batch.
    pub fn take(&self) -> Vec<Entry> {
        self.lock().take()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Span, Transaction};
    use std::sync::Arc;

    fn span_entry(category: &str) -> Entry {
        Entry::from(Span::new(category, None))
    }

    #[test]
    fn test_queue_default() {
        let queue = BoundedQueue::default();

        assert_eq!(queue.max_items(), DEFAULT_MAX_ITEMS);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.entries().is_empty());
    }

    #[test]
    fn test_default_max_items_keeps_transaction_and_100_tail_entries() {
        let mut queue = BoundedQueue::default();
        let transaction = Transaction::new("test");

        queue.add_entry(transaction.clone().into());
        assert_eq!(queue.len(), 1);

        for _ in 0..150 {
            queue.add_entry(transaction.clone().into());
        }

        assert_eq!(queue.len(), 101);
    }

    #[test]
    fn test_increased_max_items() {
        let mut queue = BoundedQueue::new(150);
        let transaction = Transaction::new("test");

        for _ in 0..150 {
            queue.add_entry(transaction.clone().into());
        }

        assert_eq!(queue.len(), 150);
    }

    #[test]
    fn test_first_entry_is_pinned_whatever_its_kind() {
        let mut queue = BoundedQueue::new(2);
        let first = span_entry("first");
        let first_id = first.id().to_string();

        queue.add_entry(first);

        assert_eq!(queue.pinned().unwrap().id(), first_id);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_tail_evicts_oldest_first() {
        let mut queue = BoundedQueue::new(3);
        queue.add_entry(Transaction::new("root").into());

        let spans: Vec<Entry> = (0..5).map(|i| span_entry(&format!("op-{i}"))).collect();
        for span in &spans {
            queue.add_entry(span.clone());
        }

        let ids: Vec<String> = queue.entries().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[1..], [spans[2].id(), spans[3].id(), spans[4].id()]);
        assert_eq!(queue.evicted(), 2);
    }

    #[test]
    fn test_pinned_entry_is_never_evicted() {
        let mut queue = BoundedQueue::new(1);
        let transaction = Transaction::new("root");
        queue.add_entry(transaction.clone().into());

        for i in 0..10 {
            queue.add_entry(span_entry(&format!("op-{i}")));
        }

        let entries = queue.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), transaction.id());
    }

    #[test]
    fn test_newest_transaction_wins_pinned_slot() {
        let mut queue = BoundedQueue::new(10);
        let first = Transaction::new("first");
        let second = Transaction::new("second");

        queue.add_entry(first.into());
        queue.add_entry(span_entry("db"));
        queue.add_entry(second.clone().into());

        assert_eq!(queue.pinned().unwrap().id(), second.id());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_transaction_replaces_pinned_span() {
        let mut queue = BoundedQueue::new(10);
        queue.add_entry(span_entry("boot"));
        let transaction = Transaction::new("root");
        queue.add_entry(transaction.clone().into());

        assert_eq!(queue.pinned().unwrap().id(), transaction.id());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_zero_max_items_keeps_only_pinned() {
        let mut queue = BoundedQueue::new(0);
        queue.add_entry(Transaction::new("root").into());
        queue.add_entry(span_entry("db"));
        queue.add_entry(span_entry("http"));

        assert_eq!(queue.len(), 1);
        assert!(queue.pinned().unwrap().is_root());
    }

    #[test]
    fn test_take_and_clear() {
        let mut queue = BoundedQueue::new(10);
        queue.add_entry(Transaction::new("root").into());
        queue.add_entry(span_entry("db"));

        let taken = queue.take();
        assert_eq!(taken.len(), 2);
        assert!(taken[0].is_root());
        assert!(queue.is_empty());

        queue.add_entry(span_entry("db"));
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pinned().is_none());
    }

    #[test]
    fn test_shared_queue_concurrent_submissions_respect_cap() {
        let queue = Arc::new(SharedQueue::new(50));
        queue.add_entry(Transaction::new("root").into());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        queue.add_entry(span_entry("work"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 51);
        assert!(queue.entries()[0].is_root());
    }
}
