//! Aggregate loading: read a stream, check it, and replay it into a fresh instance.

use serde::de::DeserializeOwned;

use shop_core::{Aggregate, AggregateId};

use crate::error::PersistenceError;
use crate::event_store::{EventStore, StoredEvent};

/// Rehydrates aggregates from an [`EventStore`].
///
/// Writes do not go through the repository; stage the loaded aggregate in a
/// [`UnitOfWork`](crate::UnitOfWork) instead.
#[derive(Debug, Clone)]
pub struct AggregateRepository<S> {
    store: S,
}

impl<S> AggregateRepository<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load an aggregate by id. `Ok(None)` when its stream has never been written.
    pub fn load<A>(&self, id: A::Id) -> Result<Option<A>, PersistenceError>
    where
        A: Aggregate,
        A::Id: Copy + Into<AggregateId>,
        A::Event: DeserializeOwned,
    {
        let aggregate_id: AggregateId = id.into();
        let history = self.store.load_stream(aggregate_id)?;
        if history.is_empty() {
            return Ok(None);
        }

        validate_loaded_stream(aggregate_id, A::AGGREGATE_TYPE, &history)?;

        let mut aggregate = A::empty(id);
        apply_history(&mut aggregate, &history)?;

        tracing::trace!(
            aggregate_type = A::AGGREGATE_TYPE,
            %aggregate_id,
            events = history.len(),
            "aggregate rehydrated"
        );

        Ok(Some(aggregate))
    }
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    stream: &[StoredEvent],
) -> Result<(), PersistenceError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(PersistenceError::CorruptedStream(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.aggregate_type != aggregate_type {
            return Err(PersistenceError::CorruptedStream(format!(
                "stream holds '{}' events, expected '{aggregate_type}'",
                e.aggregate_type
            )));
        }
        if e.sequence_number <= last {
            return Err(PersistenceError::CorruptedStream(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), PersistenceError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| PersistenceError::Deserialize(format!("{}: {e}", stored.event_type)))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{InMemoryEventStore, UncommittedEvent};
    use chrono::Utc;
    use shop_core::{AggregateRoot, ExpectedVersion, TrackedAggregate};
    use shop_members::{Member, MemberId};
    use uuid::Uuid;

    fn commit_member(store: &InMemoryEventStore, member: &mut Member) {
        let aggregate_id: AggregateId = member.id_typed().into();
        let events = member
            .take_pending_events()
            .iter()
            .map(|e| UncommittedEvent::from_typed(aggregate_id, Member::AGGREGATE_TYPE, Uuid::now_v7(), e))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        store.append(events, ExpectedVersion::Any).unwrap();
    }

    #[test]
    fn missing_stream_loads_as_none() {
        let repo = AggregateRepository::new(InMemoryEventStore::new());
        assert!(repo.load::<Member>(MemberId::generate()).unwrap().is_none());
    }

    #[test]
    fn load_replays_every_event() {
        let store = InMemoryEventStore::new();
        let mut member = Member::register(MemberId::generate(), "kim", None).unwrap();
        member.rename("lee").unwrap();
        let expected = {
            let mut m = member.clone();
            m.take_pending_events();
            m
        };
        commit_member(&store, &mut member);

        let repo = AggregateRepository::new(store);
        let loaded = repo.load::<Member>(member.id_typed()).unwrap().unwrap();

        assert_eq!(loaded, expected);
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.persisted_version(), 2);
    }

    #[test]
    fn stream_of_another_type_is_rejected() {
        let store = InMemoryEventStore::new();
        let id = MemberId::generate();
        store
            .append(
                vec![UncommittedEvent {
                    event_id: Uuid::now_v7(),
                    aggregate_id: id.into(),
                    aggregate_type: "inventory.item".to_string(),
                    event_type: "inventory.item.registered".to_string(),
                    event_version: 1,
                    occurred_at: Utc::now(),
                    payload: serde_json::json!({}),
                }],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let repo = AggregateRepository::new(store);
        match repo.load::<Member>(id) {
            Err(PersistenceError::CorruptedStream(_)) => {}
            other => panic!("Expected CorruptedStream, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_payload_is_a_deserialize_error() {
        let store = InMemoryEventStore::new();
        let id = MemberId::generate();
        store
            .append(
                vec![UncommittedEvent {
                    event_id: Uuid::now_v7(),
                    aggregate_id: id.into(),
                    aggregate_type: Member::AGGREGATE_TYPE.to_string(),
                    event_type: "members.member.registered".to_string(),
                    event_version: 1,
                    occurred_at: Utc::now(),
                    payload: serde_json::json!({ "unexpected": true }),
                }],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let repo = AggregateRepository::new(store);
        assert!(matches!(
            repo.load::<Member>(id),
            Err(PersistenceError::Deserialize(_))
        ));
    }
}
