//! Append-only event store boundary.
//!
//! One stream per aggregate, keyed by `AggregateId`. Appends are checked against
//! an expected stream version; a batch spanning several streams is committed
//! atomically.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};
