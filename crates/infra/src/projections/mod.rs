//! Projections (read model builders).
//!
//! Projections consume committed envelopes and maintain query-side views.
//! All projections are:
//! - **Rebuildable**: `reset` followed by a replay of the event log
//! - **Idempotent**: an envelope at or below a stream's cursor is ignored,
//!   which makes at-least-once delivery safe

use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use shop_core::AggregateId;
use shop_events::EventEnvelope;

use crate::event_store::StoredEvent;

pub mod items;
pub mod members;
pub mod orders;

pub use items::{ItemReadModel, ItemsProjection};
pub use members::{MemberReadModel, MembersProjection};
pub use orders::{OrderLineReadModel, OrderReadModel, OrdersProjection};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("envelope does not match its payload: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("projection state unavailable: lock poisoned")]
    Poisoned,
}

/// A read model builder fed by published envelopes.
pub trait Projection: Send + Sync {
    /// The stream type this projection consumes; other envelopes are ignored.
    fn aggregate_type(&self) -> &'static str;

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Forget all state, cursors included.
    fn reset(&self);
}

/// Last applied sequence number per aggregate stream.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `apply` for `seq` unless the stream has already seen it.
    ///
    /// Returns `Ok(false)` for duplicates. The cursor only advances when
    /// `apply` succeeds.
    pub fn advance<F>(&self, aggregate_id: AggregateId, seq: u64, apply: F) -> Result<bool, ProjectionError>
    where
        F: FnOnce() -> Result<(), ProjectionError>,
    {
        let mut cursors = self.inner.write().map_err(|_| ProjectionError::Poisoned)?;
        let last = cursors.get(&aggregate_id).copied().unwrap_or(0);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(false);
        }
        // The first envelope of a stream may start anywhere; after that, no gaps.
        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        apply()?;
        cursors.insert(aggregate_id, seq);
        Ok(true)
    }

    pub fn last(&self, aggregate_id: AggregateId) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|c| c.get(&aggregate_id).copied())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.clear();
        }
    }
}

/// Decode an envelope payload into a typed domain event.
pub(crate) fn decode<E: DeserializeOwned>(envelope: &EventEnvelope<JsonValue>) -> Result<E, ProjectionError> {
    serde_json::from_value(envelope.payload().clone())
        .map_err(|e| ProjectionError::Deserialize(format!("{}: {e}", envelope.event_type())))
}

/// Rebuild a projection from scratch by replaying the event log.
///
/// `events` must be in commit order (as returned by `EventStore::load_all`).
/// Returns how many envelopes the projection consumed.
pub fn rebuild<P>(projection: &P, events: &[StoredEvent]) -> Result<usize, ProjectionError>
where
    P: Projection + ?Sized,
{
    projection.reset();

    let mut applied = 0;
    for stored in events.iter().filter(|e| e.aggregate_type == projection.aggregate_type()) {
        projection.apply_envelope(&stored.to_envelope())?;
        applied += 1;
    }

    tracing::info!(
        aggregate_type = projection.aggregate_type(),
        applied,
        "projection rebuilt"
    );
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_skips_duplicates_and_rejects_gaps() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();

        assert!(cursors.advance(id, 1, || Ok(())).unwrap());
        assert!(!cursors.advance(id, 1, || Ok(())).unwrap());
        assert!(matches!(
            cursors.advance(id, 3, || Ok(())),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 3 })
        ));
        assert_eq!(cursors.last(id), 1);
    }

    #[test]
    fn failed_apply_does_not_move_the_cursor() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();

        let err = cursors
            .advance(id, 1, || Err(ProjectionError::Deserialize("boom".to_string())))
            .unwrap_err();

        assert!(matches!(err, ProjectionError::Deserialize(_)));
        assert_eq!(cursors.last(id), 0);
    }
}
