//! Batch assembly.
//!
//! A small `impl` driven off a reused buffer, `#[instrument]`-annotated,
//! one `tracing::trace!` per loop iteration.

use tracing::instrument;

use crate::config::MAX_BATCH_SIZE;
use crate::error::DequeueError;
use crate::queue::Queue;

/// Assembles the next outbound batch by draining `queue` into a reusable
/// byte buffer, respecting the 3 MiB cap.
///
/// An item that would overflow the cap is left dequeued and discarded
/// rather than re-enqueued — see DESIGN.md for why this is preserved
/// rather than fixed with a peek-before-dequeue.
pub struct Batcher {
    buffer: Vec<u8>,
}

impl Batcher {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_BATCH_SIZE),
        }
    }

    /// Reset the shared buffer and drain `queue` into it.
    ///
    /// Returns the number of bytes accumulated. The buffer is left
    /// populated for the caller (the drain controller) to hand off to the
    /// transport layer.
    #[instrument(name = "batcher::fill", skip(self, queue), level = "debug")]
    pub async fn fill(&mut self, queue: &dyn Queue) -> usize {
        self.buffer.clear();

        loop {
            if queue.length() == 0 {
                break;
            }

            let item = match queue.dequeue().await {
                Ok(item) => item,
                Err(DequeueError::Empty) => break,
                Err(e) => {
                    tracing::error!(error = %e, "batcher: dequeue failed, stopping batch early");
                    break;
                }
            };

            let additional = item.wire_len();
            if additional + self.buffer.len() > MAX_BATCH_SIZE {
                tracing::trace!(
                    item_len = item.value.len(),
                    buffered = self.buffer.len(),
                    "batcher: item would overflow batch, dropping without re-enqueue"
                );
                break;
            }

            self.buffer.extend_from_slice(&item.value);
            self.buffer.push(b'\n');
        }

        tracing::debug!(batch_bytes = self.buffer.len(), "batcher: batch assembled");
        self.buffer.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Batcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("buffered_bytes", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::InMemoryQueue;

    #[tokio::test]
    async fn joins_items_with_newline() {
        let queue = InMemoryQueue::new(0);
        queue.enqueue(bytes::Bytes::from_static(b"alpha")).await.unwrap();
        queue.enqueue(bytes::Bytes::from_static(b"beta")).await.unwrap();

        let mut batcher = Batcher::new();
        let n = batcher.fill(&queue).await;

        assert_eq!(batcher.bytes(), b"alpha\nbeta\n");
        assert_eq!(n, 11);
    }

    #[tokio::test]
    async fn stops_at_cap_leaving_queue_non_empty() {
        let queue = InMemoryQueue::new(0);
        for _ in 0..100 {
            queue
                .enqueue(bytes::Bytes::from(vec![b'x'; 33_000]))
                .await
                .unwrap();
        }

        let mut batcher = Batcher::new();
        let n = batcher.fill(&queue).await;

        assert!(n <= MAX_BATCH_SIZE);
        assert!(queue.length() > 0);
    }

    #[tokio::test]
    async fn empty_queue_yields_empty_batch() {
        let queue = InMemoryQueue::new(0);
        let mut batcher = Batcher::new();
        let n = batcher.fill(&queue).await;
        assert_eq!(n, 0);
        assert!(batcher.is_empty());
    }
}
