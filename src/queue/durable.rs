//! Disk-persisted queue.
//!
//! An opaque-blob FIFO keyed by `rowid`, which doubles as the monotonic
//! item id. SQLite in WAL mode backs this as a `r2d2`-pooled,
//! `rusqlite`-driven, file-backed, crash-durable FIFO with an
//! `Enqueue`/`Dequeue`/`Length`/`Close` surface.

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DequeueError, DurableQueueError};
use crate::item::Item;
use crate::queue::Queue;

/// A FIFO of opaque byte items persisted under `dir`.
///
/// Items enqueued by a prior process against the same `dir` dequeue in FIFO
/// order after a restart.
#[derive(Debug)]
pub struct DurableQueue {
    pool: Pool<SqliteConnectionManager>,
    closed: AtomicBool,
}

impl DurableQueue {
    /// Open (creating if necessary) a durable queue rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DurableQueueError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            DurableQueueError::Sqlite(rusqlite::Error::InvalidPath(
                dir.join(format!("create_dir_all failed: {e}")),
            ))
        })?;

        let manager = SqliteConnectionManager::file(dir.join("queue.sqlite3")).with_init(
            |conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode=WAL;
                     PRAGMA synchronous=FULL;",
                )
            },
        );
        let pool = Pool::new(manager).map_err(DurableQueueError::Pool)?;

        {
            let conn = pool.get().map_err(DurableQueueError::Pool)?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS queue_items (
                    id    INTEGER PRIMARY KEY AUTOINCREMENT,
                    value BLOB NOT NULL
                )",
                (),
            )
            .map_err(DurableQueueError::Sqlite)?;
        }

        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Queue for DurableQueue {
    async fn enqueue(&self, value: bytes::Bytes) -> Result<Item, DurableQueueError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(DurableQueueError::Closed);
        }

        let conn = self.pool.get().map_err(DurableQueueError::Pool)?;
        conn.execute(
            "INSERT INTO queue_items (value) VALUES (?1)",
            rusqlite::params![value.as_ref()],
        )
        .map_err(DurableQueueError::Sqlite)?;
        let id = conn.last_insert_rowid() as u64;
        Ok(Item::with_id(id, value))
    }

    async fn dequeue(&self) -> Result<Item, DequeueError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(DequeueError::Storage(DurableQueueError::Closed));
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| DequeueError::Storage(DurableQueueError::Pool(e)))?;

        let result = conn.query_row(
            "SELECT id, value FROM queue_items ORDER BY id ASC LIMIT 1",
            (),
            |row| {
                let id: i64 = row.get(0)?;
                let value: Vec<u8> = row.get(1)?;
                Ok((id, value))
            },
        );

        match result {
            Ok((id, value)) => {
                conn.execute("DELETE FROM queue_items WHERE id = ?1", rusqlite::params![id])
                    .map_err(|e| DequeueError::Storage(DurableQueueError::Sqlite(e)))?;
                Ok(Item::with_id(id as u64, value))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(DequeueError::Empty),
            Err(e) => Err(DequeueError::Storage(DurableQueueError::Sqlite(e))),
        }
    }

    fn length(&self) -> u64 {
        let Ok(conn) = self.pool.get() else {
            return 0;
        };
        conn.query_row("SELECT COUNT(*) FROM queue_items", (), |row| row.get::<_, i64>(0))
            .unwrap_or(0) as u64
    }

    fn stored_bytes(&self) -> u64 {
        0
    }

    async fn close(&self) -> Result<(), DurableQueueError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let q = DurableQueue::open(dir.path()).unwrap();

        q.enqueue(bytes::Bytes::from_static(b"one")).await.unwrap();
        q.enqueue(bytes::Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(q.dequeue().await.unwrap().value, "one");
        assert_eq!(q.dequeue().await.unwrap().value, "two");
        assert!(matches!(q.dequeue().await, Err(DequeueError::Empty)));
    }

    #[tokio::test]
    async fn survives_reopen_against_same_directory() {
        let dir = tempfile::tempdir().unwrap();

        {
            let q = DurableQueue::open(dir.path()).unwrap();
            q.enqueue(bytes::Bytes::from_static(b"persisted")).await.unwrap();
        }

        let q = DurableQueue::open(dir.path()).unwrap();
        assert_eq!(q.dequeue().await.unwrap().value, "persisted");
    }

    #[tokio::test]
    async fn length_reports_item_count_not_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let q = DurableQueue::open(dir.path()).unwrap();
        q.enqueue(bytes::Bytes::from_static(b"a longer payload than one"))
            .await
            .unwrap();
        q.enqueue(bytes::Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(q.length(), 2);
    }

    #[tokio::test]
    async fn close_rejects_further_enqueue_and_dequeue() {
        let dir = tempfile::tempdir().unwrap();
        let q = DurableQueue::open(dir.path()).unwrap();
        q.enqueue(bytes::Bytes::from_static(b"one")).await.unwrap();

        q.close().await.unwrap();
        // idempotent
        q.close().await.unwrap();

        assert!(matches!(
            q.enqueue(bytes::Bytes::from_static(b"two")).await,
            Err(DurableQueueError::Closed)
        ));
        assert!(matches!(
            q.dequeue().await,
            Err(DequeueError::Storage(DurableQueueError::Closed))
        ));
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_increase_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let first_id = {
            let q = DurableQueue::open(dir.path()).unwrap();
            q.enqueue(bytes::Bytes::from_static(b"a")).await.unwrap().id.unwrap()
        };

        let q = DurableQueue::open(dir.path()).unwrap();
        let second_id = q.enqueue(bytes::Bytes::from_static(b"b")).await.unwrap().id.unwrap();
        assert!(second_id > first_id);
    }
}
