//! Sender facade.
//!
//! Wires every component together behind one object: the queue, admission,
//! the HTTP transport, the drain controller, and the background periodic
//! driver, condensed into a single public struct a library caller
//! constructs directly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::admission::{Admission, AdmissionController};
use crate::config::SenderConfig;
use crate::drain::DrainController;
use crate::error::ShipperError;
use crate::periodic::PeriodicDriver;
use crate::queue::durable::DurableQueue;
use crate::queue::memory::InMemoryQueue;
use crate::queue::Queue;
use crate::transport::Transport;

/// Which concrete [`Queue`] backs a [`Sender`] — kept around so admission
/// can branch on variant-specific policy rather than calling `length()`
/// polymorphically for capacity decisions.
enum QueueHandle {
    InMemory(Arc<InMemoryQueue>),
    Durable { dir: PathBuf, queue: Arc<DurableQueue> },
}

impl QueueHandle {
    fn as_queue(&self) -> Arc<dyn Queue> {
        match self {
            QueueHandle::InMemory(q) => q.clone() as Arc<dyn Queue>,
            QueueHandle::Durable { queue, .. } => queue.clone() as Arc<dyn Queue>,
        }
    }
}

/// The object application code constructs and calls `send`/`write` on.
///
/// Owns the queue, the admission controller, the drain controller, the HTTP
/// transport, and the background periodic driver. Exposes `send`, `write`,
/// `drain`, `sync`, `stop`, and `close_idle_connections`.
pub struct Sender {
    config: Arc<SenderConfig>,
    queue: QueueHandle,
    admission: Arc<AdmissionController>,
    drain_controller: Arc<DrainController>,
    transport: Transport,
    periodic: Option<PeriodicDriver>,
    stopped: AtomicBool,
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("url", &self.config.url)
            .field("in_memory_queue", &self.config.in_memory_queue)
            .field("dropped_logs", &self.admission.dropped_logs())
            .finish()
    }
}

impl Sender {
    /// Construct a new sender and start its background periodic driver
    /// immediately.
    pub fn new(config: SenderConfig) -> Result<Self, ShipperError> {
        let config = Arc::new(config);

        let queue = if config.in_memory_queue {
            QueueHandle::InMemory(Arc::new(InMemoryQueue::new(config.log_count_limit)))
        } else {
            let dir = config.resolved_temp_directory();
            let durable = DurableQueue::open(&dir)?;
            QueueHandle::Durable {
                dir,
                queue: Arc::new(durable),
            }
        };

        let admission = Arc::new(AdmissionController::new(config.check_disk_space));
        let drain_controller = Arc::new(DrainController::new());
        let transport = Transport::new();

        let periodic = PeriodicDriver::spawn(
            queue.as_queue(),
            transport.clone(),
            admission.clone(),
            drain_controller.clone(),
            config.clone(),
        );

        Ok(Self {
            config,
            queue,
            admission,
            drain_controller,
            transport,
            periodic: Some(periodic),
            stopped: AtomicBool::new(false),
        })
    }

    /// Admission check followed by enqueue. Admission drops are silent
    /// (return `Ok(())`); only a storage failure is surfaced.
    pub async fn send(&self, payload: impl Into<bytes::Bytes>) -> Result<(), ShipperError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ShipperError::Stopped);
        }

        let payload = payload.into();

        let admitted = match &self.queue {
            QueueHandle::InMemory(queue) => self.admission.check_in_memory(
                queue.as_ref(),
                payload.len(),
                self.config.in_memory_capacity,
                self.config.log_count_limit,
            ),
            QueueHandle::Durable { dir, .. } => {
                self.admission.check_disk(dir, self.config.disk_threshold)
            }
        };

        if admitted == Admission::Reject {
            return Ok(());
        }

        self.queue.as_queue().enqueue(payload).await?;
        Ok(())
    }

    /// Equivalent to [`Sender::send`], returning the number of bytes
    /// accepted for `io::Write`-alike call sites.
    pub async fn write(&self, payload: impl Into<bytes::Bytes>) -> Result<usize, ShipperError> {
        let payload = payload.into();
        let len = payload.len();
        self.send(payload).await?;
        Ok(len)
    }

    /// Run one full drain synchronously.
    pub async fn drain(&self) {
        self.drain_controller
            .drain(
                self.queue.as_queue().as_ref(),
                &self.transport,
                &self.admission,
                &self.config,
            )
            .await;
    }

    /// Alias for [`Sender::drain`] that always returns success: drain
    /// failures are absorbed internally, never propagated.
    pub async fn sync(&self) -> Result<(), ShipperError> {
        self.drain().await;
        Ok(())
    }

    /// Final synchronous drain, then close the queue. No further `send` is
    /// valid afterward.
    pub async fn stop(&mut self) {
        self.drain().await;

        if let Some(mut periodic) = self.periodic.take() {
            periodic.stop().await;
        }

        if let Err(e) = self.queue.as_queue().close().await {
            tracing::error!(error = %e, "sender: failed to close queue during stop");
        }

        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Forward to the HTTP transport.
    pub fn close_idle_connections(&mut self) {
        self.transport.close_idle_connections();
    }

    /// Current dropped-log count, exposed for callers who want to surface
    /// it themselves (e.g. in their own metrics).
    pub fn dropped_logs(&self) -> u64 {
        self.admission.dropped_logs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn set_url_composes_token() {
        let config = SenderConfig::builder("token")
            .url("http://localhost:12345")
            .build();
        assert_eq!(
            config.resolved_url_string(),
            "http://localhost:12345/?token=token"
        );
    }

    #[tokio::test]
    async fn empty_token_skips_query_rewrite() {
        let config = SenderConfig::builder("").url("http://localhost:12345").build();
        assert_eq!(config.resolved_url_string(), "http://localhost:12345");
    }

    #[tokio::test]
    async fn write_returns_payload_length_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut sender = Sender::new(
            SenderConfig::builder("token")
                .url(server.uri())
                .in_memory_queue(true)
                .compress(false)
                .drain_duration(std::time::Duration::from_secs(3600))
                .build(),
        )
        .unwrap();

        let n = sender.write(bytes::Bytes::from_static(b"blah")).await.unwrap();
        assert_eq!(n, 4);
        sender.stop().await;
    }

    #[tokio::test]
    async fn dropped_counter_resets_on_next_successful_drain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut sender = Sender::new(
            SenderConfig::builder("token")
                .url(server.uri())
                .in_memory_queue(true)
                .in_memory_capacity(500)
                .compress(false)
                .drain_duration(std::time::Duration::from_secs(3600))
                .build(),
        )
        .unwrap();

        for _ in 0..3 {
            sender.send(bytes::Bytes::from(vec![0u8; 600])).await.unwrap();
        }
        assert_eq!(sender.dropped_logs(), 3);

        sender.send(bytes::Bytes::from_static(b"hi")).await.unwrap();
        sender.drain().await;

        assert_eq!(sender.dropped_logs(), 0);
        sender.stop().await;
    }
}
