//! Drain controller.
//!
//! An outer loop that keeps producing batches, an inner retry loop with
//! exponential backoff, and a requeue-on-exhaustion path that hands a
//! failed unit of work back to the front of the pipeline rather than
//! losing it outright.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::admission::{Admission, AdmissionController};
use crate::batcher::Batcher;
use crate::config::SenderConfig;
use crate::metrics;
use crate::queue::Queue;
use crate::retry::{backoff_before_attempt, should_retry, SEND_RETRIES};
use crate::transport::Transport;

/// Orchestrates batching -> posting -> retry/backoff -> requeue.
///
/// Only one drain executes at a time; concurrent callers serialize on
/// `lock`. `draining` is diagnostic only — logged, never used to skip a
/// drain.
#[derive(Debug)]
pub struct DrainController {
    lock: Mutex<()>,
    draining: AtomicBool,
    batcher: Mutex<Batcher>,
}

impl DrainController {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            draining: AtomicBool::new(false),
            batcher: Mutex::new(Batcher::new()),
        }
    }

    /// Run one full drain: repeatedly batch and post until the queue is
    /// empty or a batch exhausts its retries and is requeued.
    #[instrument(name = "drain::run", skip_all, level = "debug")]
    pub async fn drain(
        &self,
        queue: &dyn Queue,
        transport: &Transport,
        admission: &AdmissionController,
        config: &SenderConfig,
    ) {
        if self.draining.load(Ordering::SeqCst) {
            tracing::warn!("drain: already draining, proceeding to serialize on the lock anyway");
        }

        let _guard = self.lock.lock().await;
        self.draining.store(true, Ordering::SeqCst);

        let url = match config.resolved_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "drain: cannot resolve url, aborting drain");
                self.draining.store(false, Ordering::SeqCst);
                return;
            }
        };

        let mut batcher = self.batcher.lock().await;
        let mut re_drain = true;

        while queue.length() > 0 && re_drain {
            if config.metrics_enabled {
                metrics::QUEUE_LENGTH.set(queue.length() as f64);
            }

            let batch_bytes = batcher.fill(queue).await;
            if batch_bytes == 0 {
                // Nothing batchable (the head item itself overflowed the
                // cap and was dropped by the batcher) — keep looping so
                // forward progress is made against the rest of the queue.
                continue;
            }

            if config.metrics_enabled {
                metrics::BATCH_BYTES.observe(batch_bytes as f64);
            }

            re_drain = self
                .send_with_retry(&mut batcher, transport, admission, config, &url, queue)
                .await;
        }

        self.draining.store(false, Ordering::SeqCst);
    }

    /// Attempt delivery of the buffered batch up to `SEND_RETRIES` times.
    /// Returns whether the outer drain loop should continue (`true`) or
    /// stop (`false`, set after a requeue).
    async fn send_with_retry(
        &self,
        batcher: &mut Batcher,
        transport: &Transport,
        admission: &AdmissionController,
        config: &SenderConfig,
        url: &reqwest::Url,
        queue: &dyn Queue,
    ) -> bool {
        for attempt in 1..=SEND_RETRIES {
            if attempt > 1 {
                let backoff = backoff_before_attempt(attempt);
                tracing::debug!(attempt, ?backoff, "drain: sleeping before retry");
                tokio::time::sleep(backoff).await;
            }

            if config.metrics_enabled {
                metrics::DRAIN_ATTEMPTS_TOTAL.inc();
            }

            let status = transport
                .post(
                    url,
                    batcher.bytes(),
                    config.compress,
                    attempt,
                    admission.dropped_logs(),
                )
                .await;

            if status == 200 {
                admission.reset();
            }

            if !should_retry(status) {
                tracing::debug!(status, attempt, "drain: non-retriable response, batch consumed");
                return true;
            }

            if attempt == SEND_RETRIES {
                tracing::warn!(
                    status,
                    attempts = SEND_RETRIES,
                    "drain: retries exhausted, requeuing batch as a single item"
                );
                requeue(queue, batcher.bytes(), admission, config).await;
                return false;
            }

            tracing::debug!(status, attempt, "drain: retriable response, retrying");
        }

        unreachable!("loop always returns by attempt == SEND_RETRIES")
    }
}

impl Default for DrainController {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-insert a failed batch as one combined opaque item at the queue tail,
/// via the same admission check `Sender::send` runs — the requeue is a new
/// arrival from the pipeline's point of view and is subject to the same
/// capacity and disk-threshold policy, counted as a drop on rejection.
async fn requeue(queue: &dyn Queue, batch: &[u8], admission: &AdmissionController, config: &SenderConfig) {
    let admitted = if config.in_memory_queue {
        admission.check_in_memory(queue, batch.len(), config.in_memory_capacity, config.log_count_limit)
    } else {
        admission.check_disk(&config.resolved_temp_directory(), config.disk_threshold)
    };

    if admitted == Admission::Reject {
        tracing::warn!("drain: requeue rejected by admission, batch dropped");
        return;
    }

    if let Err(e) = queue.enqueue(bytes::Bytes::copy_from_slice(batch)).await {
        tracing::error!(error = %e, "drain: failed to requeue exhausted batch");
    }
}
