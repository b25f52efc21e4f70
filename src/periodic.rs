//! Periodic drain driver.
//!
//! `tokio::spawn` plus `tokio::select!` against a
//! [`tokio_util::sync::CancellationToken`], so `stop()` actually cancels
//! and joins the background task rather than leaking it.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::admission::AdmissionController;
use crate::config::SenderConfig;
use crate::drain::DrainController;
use crate::queue::Queue;
use crate::transport::Transport;

/// Owns the background task that calls `Drain()` every `drain_duration`.
#[derive(Debug)]
pub struct PeriodicDriver {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicDriver {
    /// Spawn the background loop immediately, at construction rather than
    /// on first use.
    #[instrument(name = "periodic::spawn", skip_all, level = "debug")]
    pub fn spawn(
        queue: Arc<dyn Queue>,
        transport: Transport,
        admission: Arc<AdmissionController>,
        drain_controller: Arc<DrainController>,
        config: Arc<SenderConfig>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let drain_duration = config.drain_duration;

        let handle = tokio::spawn(async move {
            run(
                queue,
                transport,
                admission,
                drain_controller,
                config,
                drain_duration,
                task_cancel,
            )
            .await;
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel the background loop and wait for it to exit.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn run(
    queue: Arc<dyn Queue>,
    transport: Transport,
    admission: Arc<AdmissionController>,
    drain_controller: Arc<DrainController>,
    config: Arc<SenderConfig>,
    drain_duration: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("periodic driver: cancelled, exiting background loop");
                break;
            }
            _ = tokio::time::sleep(drain_duration) => {
                tracing::trace!("periodic driver: cadence elapsed, triggering drain");
                drain_controller.drain(queue.as_ref(), &transport, &admission, &config).await;
            }
        }
    }
}
