//! Client-side log shipper.
//!
//! Buffers opaque log records, batches them up to a byte cap, compresses and
//! ships them over HTTP with bounded retry and exponential backoff, and
//! requeues whatever a server still won't accept after exhausting retries.
//! A background driver keeps draining on a fixed cadence so callers don't
//! have to poll it themselves.
//!
//! # Architecture
//!
//! - [`config`] - [`SenderConfig`] and its builder, loadable from TOML
//! - [`queue`] - the [`queue::Queue`] trait and its two backing stores
//! - [`admission`] - accept/drop policy run before a payload reaches a queue
//! - [`batcher`] - assembles the next outbound batch from a queue
//! - [`retry`] - retry classification and backoff schedule
//! - [`transport`] - the HTTP client that actually posts batches
//! - [`drain`] - the batch -> post -> retry -> requeue state machine
//! - [`periodic`] - the background task that drains on a fixed cadence
//! - [`sender`] - [`Sender`], the object application code constructs

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(clippy::todo)]

pub mod admission;
pub mod batcher;
pub mod config;
pub mod drain;
pub mod error;
pub mod item;
pub mod metrics;
pub mod periodic;
pub mod queue;
pub mod retry;
pub mod sender;
pub mod transport;

pub use config::{SenderConfig, SenderConfigBuilder};
pub use error::{DequeueError, DurableQueueError, ShipperError};
pub use item::Item;
pub use queue::durable::DurableQueue;
pub use queue::memory::InMemoryQueue;
pub use queue::Queue;
pub use sender::Sender;
