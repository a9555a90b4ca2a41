//! Read model storage: disposable key/value views rebuilt from the event log.

pub mod store;

pub use store::{InMemoryReadModelStore, ReadModelStore};
