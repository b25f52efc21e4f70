//! Admission control.
//!
//! Two disjoint policies run before a payload ever reaches a queue: a
//! disk-free probe for the durable queue, a byte-capacity check for the
//! in-memory queue.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use sysinfo::Disks;
use tracing::instrument;

use crate::metrics;
use crate::queue::Queue;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Reject,
}

/// Tracks `droppedLogs` and the latched `checkDiskSpace` flag, and decides
/// accept-vs-drop for each `Send` before the payload reaches the queue.
#[derive(Debug)]
pub struct AdmissionController {
    dropped_logs: AtomicU64,
    check_disk_space: AtomicBool,
}

impl AdmissionController {
    pub fn new(check_disk_space: bool) -> Self {
        Self {
            dropped_logs: AtomicU64::new(0),
            check_disk_space: AtomicBool::new(check_disk_space),
        }
    }

    /// Current dropped-log count, read at request-building time and
    /// reported in the `logzio-shipper` header.
    pub fn dropped_logs(&self) -> u64 {
        self.dropped_logs.load(Ordering::SeqCst)
    }

    /// Reset on the first successful HTTP 200 response.
    pub fn reset(&self) {
        self.dropped_logs.store(0, Ordering::SeqCst);
    }

    fn record_drop(&self) {
        self.dropped_logs.fetch_add(1, Ordering::SeqCst);
        metrics::DROPPED_LOGS_TOTAL.inc();
    }

    /// Durable (disk-based) admission policy: reject when `dir`'s used
    /// percent exceeds `disk_threshold`. If the probe itself errors, latch
    /// `checkDiskSpace` to false and reject-once for this call; subsequent
    /// calls bypass the check entirely.
    #[instrument(name = "admission::check_disk", skip(self), level = "debug")]
    pub fn check_disk(&self, dir: &Path, disk_threshold: f64) -> Admission {
        if !self.check_disk_space.load(Ordering::SeqCst) {
            return Admission::Accept;
        }

        match used_percent(dir) {
            Some(used_percent) => {
                if used_percent > disk_threshold {
                    tracing::debug!(used_percent, disk_threshold, "admission: disk threshold exceeded, dropping");
                    self.record_drop();
                    Admission::Reject
                } else {
                    Admission::Accept
                }
            }
            None => {
                tracing::debug!("admission: disk probe failed, latching checkDiskSpace off");
                self.check_disk_space.store(false, Ordering::SeqCst);
                self.record_drop();
                Admission::Reject
            }
        }
    }

    /// In-memory (byte-capacity) admission policy: reject when
    /// `queue.stored_bytes() + payload_len >= in_memory_capacity`, and
    /// reject when the queue is already at `log_count_limit` items.
    ///
    /// Takes `queue` as a trait object (rather than the concrete
    /// `InMemoryQueue`) so the same check can run both at `send` time and
    /// from the drain loop's requeue path, which only ever holds a `&dyn
    /// Queue`.
    #[instrument(name = "admission::check_in_memory", skip(self, queue), level = "debug")]
    pub fn check_in_memory(
        &self,
        queue: &dyn Queue,
        payload_len: usize,
        in_memory_capacity: u64,
        log_count_limit: u64,
    ) -> Admission {
        let projected = queue.stored_bytes() + payload_len as u64;
        if projected >= in_memory_capacity {
            tracing::debug!(projected, in_memory_capacity, "admission: byte capacity exceeded, dropping");
            self.record_drop();
            return Admission::Reject;
        }

        if log_count_limit != 0 && queue.length() >= log_count_limit {
            tracing::debug!(log_count_limit, "admission: item count limit reached, dropping");
            self.record_drop();
            return Admission::Reject;
        }

        Admission::Accept
    }
}

/// Used-percent of the disk containing `dir`, or `None` on probe failure.
fn used_percent(dir: &Path) -> Option<f64> {
    let disks = Disks::new_with_refreshed_list();
    let canonical = dir.canonicalize().ok();
    let target = canonical.as_deref().unwrap_or(dir);

    let best = disks
        .list()
        .iter()
        .filter(|d| target.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;

    let total = best.total_space();
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(best.available_space());
    Some(used as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::InMemoryQueue;

    #[test]
    fn disk_probe_failure_latches_check_disk_space_off() {
        let controller = AdmissionController::new(true);
        let bogus = Path::new("/this/path/should/not/resolve/to/any/mount/ever");

        assert_eq!(controller.check_disk(bogus, 95.0), Admission::Reject);
        assert_eq!(controller.dropped_logs(), 1);

        // Second call bypasses the probe entirely now that it's latched off.
        assert_eq!(controller.check_disk(bogus, 0.0), Admission::Accept);
        assert_eq!(controller.dropped_logs(), 1);
    }

    #[test]
    fn in_memory_capacity_reject_then_accept_then_reject() {
        let controller = AdmissionController::new(false);
        let queue = InMemoryQueue::new(0);

        // scenario 3: inMemoryCapacity = 500
        assert_eq!(controller.check_in_memory(&queue, 1000, 500, 0), Admission::Reject);
        assert_eq!(controller.dropped_logs(), 1);

        assert_eq!(controller.check_in_memory(&queue, 200, 500, 0), Admission::Accept);
        // caller enqueues on Accept; simulate it here for the next check
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(async {
                queue.enqueue(bytes::Bytes::from(vec![0u8; 200])).await.unwrap();
            });

        assert_eq!(controller.check_in_memory(&queue, 400, 500, 0), Admission::Reject);
        assert_eq!(controller.dropped_logs(), 2);
        assert_eq!(queue.stored_bytes(), 200);
    }

    #[test]
    fn item_count_limit_rejects_independent_of_byte_capacity() {
        let controller = AdmissionController::new(false);
        let queue = InMemoryQueue::new(1);
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(async {
                queue.enqueue(bytes::Bytes::from_static(b"x")).await.unwrap();
            });

        assert_eq!(controller.check_in_memory(&queue, 1, 1_000_000, 1), Admission::Reject);
    }

    #[test]
    fn reset_zeroes_dropped_logs() {
        let controller = AdmissionController::new(false);
        let queue = InMemoryQueue::new(0);
        controller.check_in_memory(&queue, 1000, 500, 0);
        assert_eq!(controller.dropped_logs(), 1);
        controller.reset();
        assert_eq!(controller.dropped_logs(), 0);
    }
}
