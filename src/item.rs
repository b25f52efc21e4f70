use bytes::Bytes;

/// A single opaque log record moving through the queue.
///
/// `id` is only meaningful for items that passed through the durable queue
/// (it is the row's monotonic SQLite id); the in-memory queue never assigns
/// one, since nothing downstream keys off it.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: Option<u64>,
    pub value: Bytes,
}

impl Item {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            id: None,
            value: value.into(),
        }
    }

    pub fn with_id(id: u64, value: impl Into<Bytes>) -> Self {
        Self {
            id: Some(id),
            value: value.into(),
        }
    }

    /// Bytes this item contributes to a batch: the payload plus the `\n` delimiter.
    pub fn wire_len(&self) -> usize {
        self.value.len() + 1
    }
}
