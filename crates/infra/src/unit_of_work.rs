//! Unit of work: collect the pending changes of several aggregates and commit
//! them as one atomic append.

use serde::Serialize;
use uuid::Uuid;

use shop_core::{AggregateId, ExpectedVersion, TrackedAggregate};

use crate::error::PersistenceError;
use crate::event_store::{EventStore, StoredEvent, StreamAppend, UncommittedEvent};

/// A set of staged aggregate changes.
///
/// Each staged aggregate is checked against the stream version it was loaded
/// at. Dropping a unit of work without calling [`commit`](Self::commit)
/// discards everything staged.
#[derive(Debug)]
pub struct UnitOfWork<'s, S> {
    store: &'s S,
    staged: Vec<StreamAppend>,
}

impl<'s, S> UnitOfWork<'s, S>
where
    S: EventStore,
{
    pub fn begin(store: &'s S) -> Self {
        Self {
            store,
            staged: Vec::new(),
        }
    }

    /// Drain `aggregate`'s pending events into this unit of work.
    ///
    /// An aggregate with nothing pending is skipped. If the commit later fails,
    /// the drained changes are gone with it: reload before retrying.
    pub fn stage<A>(&mut self, aggregate: &mut A) -> Result<(), PersistenceError>
    where
        A: TrackedAggregate,
        A::Id: Copy + Into<AggregateId>,
        A::Event: shop_events::Event + Serialize,
    {
        if aggregate.pending_events().is_empty() {
            return Ok(());
        }

        let expected = ExpectedVersion::Exact(aggregate.persisted_version());
        let aggregate_id: AggregateId = (*aggregate.id()).into();

        let events = aggregate
            .take_pending_events()
            .iter()
            .map(|e| UncommittedEvent::from_typed(aggregate_id, A::AGGREGATE_TYPE, Uuid::now_v7(), e))
            .collect::<Result<Vec<_>, _>>()?;

        self.staged.push(StreamAppend::new(expected, events));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Number of streams staged so far.
    pub fn stream_count(&self) -> usize {
        self.staged.len()
    }

    /// Append every staged stream atomically. Returns the committed events in
    /// staging order.
    pub fn commit(self) -> Result<Vec<StoredEvent>, PersistenceError> {
        if self.staged.is_empty() {
            return Ok(vec![]);
        }

        let streams = self.staged.len();
        let committed = self.store.append_batch(self.staged)?;
        tracing::debug!(streams, events = committed.len(), "unit of work committed");
        Ok(committed)
    }
}
