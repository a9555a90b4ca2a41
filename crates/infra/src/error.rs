//! Errors raised while loading or committing aggregates.

use thiserror::Error;

use crate::event_store::EventStoreError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The event store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// A stored payload could not be decoded into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),

    /// A loaded stream breaks an ordering or ownership rule.
    #[error("corrupted stream: {0}")]
    CorruptedStream(String),
}

impl PersistenceError {
    /// Whether retrying the whole operation against fresh state may succeed.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, PersistenceError::Store(EventStoreError::Concurrency(_)))
    }
}
