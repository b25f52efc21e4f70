//! Bounded, process-local queue backed by a `VecDeque`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{DequeueError, DurableQueueError};
use crate::item::Item;
use crate::queue::Queue;

/// In-memory FIFO bounded by `log_count_limit` items.
///
/// `length()` (the `Queue` trait's "anything present" predicate) reports
/// item count, the same as the durable queue. The summed payload bytes
/// currently stored — the admission controller's byte-capacity proxy — are
/// tracked separately via [`Queue::stored_bytes`], since a byte sum can be
/// zero while items are still queued (a zero-length payload) and must never
/// be mistaken for "empty".
#[derive(Debug)]
pub struct InMemoryQueue {
    items: Mutex<VecDeque<Item>>,
    log_count_limit: u64,
    stored_bytes: AtomicU64,
}

impl InMemoryQueue {
    pub fn new(log_count_limit: u64) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            log_count_limit,
            stored_bytes: AtomicU64::new(0),
        }
    }

    /// Item count currently stored, checked by
    /// [`crate::admission::AdmissionController`] against `log_count_limit`
    /// before it ever calls `enqueue` — `enqueue` itself never fails;
    /// admission is solely responsible for preventing overflow.
    pub fn item_count(&self) -> u64 {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len() as u64
    }

    pub fn log_count_limit(&self) -> u64 {
        self.log_count_limit
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn enqueue(&self, value: bytes::Bytes) -> Result<Item, DurableQueueError> {
        let item = Item::new(value);
        self.stored_bytes
            .fetch_add(item.value.len() as u64, Ordering::Relaxed);
        let returned = item.clone();
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
        Ok(returned)
    }

    async fn dequeue(&self) -> Result<Item, DequeueError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        match items.pop_front() {
            Some(item) => {
                self.stored_bytes
                    .fetch_sub(item.value.len() as u64, Ordering::Relaxed);
                Ok(item)
            }
            None => Err(DequeueError::Empty),
        }
    }

    fn length(&self) -> u64 {
        self.item_count()
    }

    fn stored_bytes(&self) -> u64 {
        self.stored_bytes.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), DurableQueueError> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.stored_bytes.store(0, Ordering::Relaxed);
        Ok(())
    }
}
