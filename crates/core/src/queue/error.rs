use thiserror::Error;

use crate::ticket::StoreError;

/// Errors surfaced by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no staging zone available")]
    CapacityExceeded,

    #[error("queue state inconsistent: {0}")]
    Consistency(String),

    #[error("partial write, failed ids: {0:?}")]
    PartialWrite(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for QueueError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => QueueError::NotFound(id),
            StoreError::PartialWrite(ids) => QueueError::PartialWrite(ids),
            StoreError::Database(msg) => QueueError::Store(msg),
        }
    }
}
