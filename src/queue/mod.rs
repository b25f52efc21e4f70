//! Queue abstraction.
//!
//! Two variants behind one [`Queue`] trait: [`memory::InMemoryQueue`] (bounded,
//! process-local) and [`durable::DurableQueue`] (disk-persisted, survives
//! restarts). `length()` reports item count for both, consistently, so the
//! drain loop and batcher can treat it as a `> 0` "anything present"
//! predicate without special-casing either variant — including a queued
//! zero-byte payload, which has zero weight in any byte sum but is still one
//! item. Byte-based capacity accounting (the in-memory queue's admission
//! check) reads [`memory::InMemoryQueue::stored_bytes`] instead.

pub mod durable;
pub mod memory;

use async_trait::async_trait;

use crate::error::{DequeueError, DurableQueueError};
use crate::item::Item;

/// A FIFO of opaque byte items.
#[async_trait]
pub trait Queue: Send + Sync + std::fmt::Debug {
    /// Append `value` to the tail of the queue.
    async fn enqueue(&self, value: bytes::Bytes) -> Result<Item, DurableQueueError>;

    /// Remove and return the item at the head of the queue, if any.
    async fn dequeue(&self) -> Result<Item, DequeueError>;

    /// Item count currently stored, for both variants. Use as a non-empty
    /// predicate (`length() > 0`); for in-memory byte-capacity accounting
    /// use [`Queue::stored_bytes`] instead.
    fn length(&self) -> u64;

    /// Sum of payload bytes currently stored. Meaningful only for
    /// [`memory::InMemoryQueue`], whose admission policy is byte-capacity
    /// based; [`durable::DurableQueue`] (disk-threshold based) always
    /// reports `0` and is never consulted for it.
    fn stored_bytes(&self) -> u64;

    /// Release resources. Idempotent.
    async fn close(&self) -> Result<(), DurableQueueError>;
}
