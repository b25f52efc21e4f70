//! Crate error types.
//!
//! `anyhow` is used for internal, non-public-API glue such as config
//! loading; `thiserror` is used for errors that cross a public component
//! seam.

use thiserror::Error;

/// Errors a caller of [`crate::Sender`] can observe.
///
/// Per the shipper's error-handling design, only enqueue-time storage
/// failures are surfaced here; admission drops are silent and delivery
/// failures are absorbed by the drain loop.
#[derive(Debug, Error)]
pub enum ShipperError {
    /// The durable queue failed to persist an item.
    #[error("durable queue storage error: {0}")]
    EnqueueStorage(#[from] DurableQueueError),

    /// The sender was used after [`crate::Sender::stop`].
    #[error("sender has already been stopped")]
    Stopped,

    /// Configuration supplied at construction time was invalid.
    #[error("invalid sender configuration: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced by the durable, disk-backed queue implementation.
#[derive(Debug, Error)]
pub enum DurableQueueError {
    /// Failed to obtain or use a pooled SQLite connection.
    #[error("sqlite connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The queue was used after `close()`.
    #[error("durable queue is closed")]
    Closed,
}

/// Distinguishes an empty queue from a genuine I/O failure on dequeue.
#[derive(Debug, Error)]
pub enum DequeueError {
    /// No item is currently available.
    #[error("queue is empty")]
    Empty,

    /// The underlying storage failed while attempting to dequeue.
    #[error("durable queue storage error: {0}")]
    Storage(#[from] DurableQueueError),
}
