//! Aggregate root traits for event-sourced domain models.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Counts every applied event, committed or pending.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the stream to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics.
///
/// - **Decision logic**: `handle(&self, cmd)` returns events and never mutates.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. A failed `handle` leaves the aggregate exactly
/// as it was, which is what makes a business operation all-or-nothing.
pub trait Aggregate: AggregateRoot + Sized {
    /// Stable stream type name (e.g. "inventory.item").
    const AGGREGATE_TYPE: &'static str;

    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Create an empty, not-yet-created instance for rehydration.
    fn empty(id: Self::Id) -> Self;

    /// Evolve in-memory state from a single event (+1 version per event).
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Decide, then apply every decided event.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

/// An aggregate that remembers the events applied since it was loaded.
///
/// Business methods on domain aggregates go through `execute` and push the
/// resulting events here; the unit of work drains them on commit.
pub trait TrackedAggregate: Aggregate {
    /// Events applied but not yet persisted, oldest first.
    fn pending_events(&self) -> &[Self::Event];

    /// Drain the pending events.
    fn take_pending_events(&mut self) -> Vec<Self::Event>;

    /// Version of the stream this instance was loaded from.
    fn persisted_version(&self) -> u64 {
        self.version() - self.pending_events().len() as u64
    }
}
