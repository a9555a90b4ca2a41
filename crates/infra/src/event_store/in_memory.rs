use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use shop_core::AggregateId;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend};

#[derive(Debug, Default)]
struct State {
    streams: HashMap<AggregateId, Vec<StoredEvent>>,
    /// Every committed event in commit order.
    log: Vec<StoredEvent>,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. All appends are serialized behind one write lock, so a
/// batch is checked and written as a single step.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: RwLock<State>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn validate_stream_append(append: &StreamAppend) -> Result<(AggregateId, String), EventStoreError> {
        let first = append
            .events
            .first()
            .ok_or_else(|| EventStoreError::InvalidAppend("stream append has no events".to_string()))?;
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in append.events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "stream append contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream append contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        Ok((aggregate_id, aggregate_type))
    }
}

impl EventStore for InMemoryEventStore {
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        let batch: Vec<StreamAppend> = batch.into_iter().filter(|a| !a.events.is_empty()).collect();
        if batch.is_empty() {
            return Ok(vec![]);
        }

        let mut targets = Vec::with_capacity(batch.len());
        let mut seen = HashSet::new();
        for append in &batch {
            let (aggregate_id, aggregate_type) = Self::validate_stream_append(append)?;
            if !seen.insert(aggregate_id) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch targets stream {aggregate_id} more than once"
                )));
            }
            targets.push((aggregate_id, aggregate_type));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        // Check every stream before writing any of them.
        for ((aggregate_id, aggregate_type), append) in targets.iter().zip(&batch) {
            let stream = state.streams.get(aggregate_id).map(Vec::as_slice).unwrap_or(&[]);
            let current = Self::current_version(stream);

            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream {aggregate_id}: expected {:?}, found {current}",
                    append.expected_version
                )));
            }

            if let Some(existing) = stream.first() {
                if &existing.aggregate_type != aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{}', attempted append with '{}'",
                        existing.aggregate_type, aggregate_type
                    )));
                }
            }
        }

        let mut committed = Vec::new();
        for ((aggregate_id, _), append) in targets.into_iter().zip(batch) {
            let stream = state.streams.entry(aggregate_id).or_default();
            let mut next = Self::current_version(stream) + 1;
            let mut written = Vec::with_capacity(append.events.len());

            for e in append.events {
                written.push(StoredEvent {
                    event_id: e.event_id,
                    aggregate_id: e.aggregate_id,
                    aggregate_type: e.aggregate_type,
                    sequence_number: next,
                    event_type: e.event_type,
                    event_version: e.event_version,
                    occurred_at: e.occurred_at,
                    payload: e.payload,
                });
                next += 1;
            }

            stream.extend(written.iter().cloned());
            committed.extend(written);
        }

        state.log.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(state.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(state.log.clone())
    }
}
