//! Application services.
//!
//! Every write follows the same path:
//!
//! ```text
//! load aggregates → domain operation → stage in a UnitOfWork
//!   → atomic commit → read models → bus
//! ```
//!
//! Domain code stays pure; this layer owns the cross-aggregate rules (unique
//! member names, retry on optimistic-concurrency conflicts).

use std::sync::{Mutex, MutexGuard};

use serde_json::Value as JsonValue;
use thiserror::Error;

use shop_core::DomainError;
use shop_events::{EventBus, EventEnvelope, InMemoryEventBus};
use shop_infra::event_store::{EventStore, InMemoryEventStore, StoredEvent};
use shop_infra::projections::{
    self, ItemReadModel, ItemsProjection, MemberReadModel, MembersProjection, OrderReadModel,
    OrdersProjection, Projection, ProjectionError,
};
use shop_infra::read_model::InMemoryReadModelStore;
use shop_infra::{AggregateRepository, PersistenceError, UnitOfWork};
use shop_inventory::ItemId;
use shop_members::MemberId;
use shop_orders::OrderId;

pub mod item_service;
pub mod member_service;
pub mod order_service;

pub use item_service::{ItemService, ItemUpdate, NewItem};
pub use member_service::{MemberService, NewMember};
pub use order_service::{OrderLineRequest, OrderSearch, OrderService};

pub type JsonEnvelope = EventEnvelope<JsonValue>;

/// A shop wired to the in-memory store and bus.
pub type InMemoryShop = Shop<InMemoryEventStore, InMemoryEventBus<JsonEnvelope>>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("{0} not found")]
    NotFound(String),

    /// Publication failed after a successful commit; the events stay committed.
    #[error("failed to publish committed events: {0}")]
    Publish(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, ServiceError::Persistence(e) if e.is_concurrency_conflict())
    }

    pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{what} {id}"))
    }
}

/// The query side: one projection per aggregate type.
#[derive(Debug)]
pub struct ReadModels {
    pub members: MembersProjection<InMemoryReadModelStore<MemberId, MemberReadModel>>,
    pub items: ItemsProjection<InMemoryReadModelStore<ItemId, ItemReadModel>>,
    pub orders: OrdersProjection<InMemoryReadModelStore<OrderId, OrderReadModel>>,
}

impl ReadModels {
    pub fn new() -> Self {
        Self {
            members: MembersProjection::new(InMemoryReadModelStore::new()),
            items: ItemsProjection::new(InMemoryReadModelStore::new()),
            orders: OrdersProjection::new(InMemoryReadModelStore::new()),
        }
    }

    fn projections(&self) -> [&dyn Projection; 3] {
        [&self.members, &self.items, &self.orders]
    }

    /// Route an envelope to every projection; each ignores foreign stream types.
    pub fn apply(&self, envelope: &JsonEnvelope) -> Result<(), ProjectionError> {
        for projection in self.projections() {
            projection.apply_envelope(envelope)?;
        }
        Ok(())
    }

    pub fn rebuild(&self, log: &[StoredEvent]) -> Result<(), ProjectionError> {
        for projection in self.projections() {
            projections::rebuild(projection, log)?;
        }
        Ok(())
    }
}

impl Default for ReadModels {
    fn default() -> Self {
        Self::new()
    }
}

/// Service container: event store, bus and read models.
///
/// Use the [`members`](Shop::members), [`items`](Shop::items) and
/// [`orders`](Shop::orders) views to run operations.
#[derive(Debug)]
pub struct Shop<S, B> {
    store: S,
    bus: B,
    read_models: ReadModels,
    max_conflict_retries: u32,
    /// Held from the duplicate-name check through the commit of a join/rename.
    member_names: Mutex<()>,
    /// Serializes commit → read models → publish so projections see each stream in order.
    writes: Mutex<()>,
}

impl InMemoryShop {
    pub fn in_memory(max_conflict_retries: u32) -> Self {
        Shop::new(InMemoryEventStore::new(), InMemoryEventBus::new(), max_conflict_retries)
    }
}

impl<S, B> Shop<S, B>
where
    S: EventStore,
    B: EventBus<JsonEnvelope>,
{
    pub fn new(store: S, bus: B, max_conflict_retries: u32) -> Self {
        Self {
            store,
            bus,
            read_models: ReadModels::new(),
            max_conflict_retries,
            member_names: Mutex::new(()),
            writes: Mutex::new(()),
        }
    }

    pub fn members(&self) -> MemberService<'_, S, B> {
        MemberService::new(self)
    }

    pub fn items(&self) -> ItemService<'_, S, B> {
        ItemService::new(self)
    }

    pub fn orders(&self) -> OrderService<'_, S, B> {
        OrderService::new(self)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn read_models(&self) -> &ReadModels {
        &self.read_models
    }

    /// Discard every read model and replay the full event log into it.
    ///
    /// Holds the member-name guard too: the member directory is empty while it
    /// is replayed, and joins must not check names against it.
    pub fn rebuild_read_models(&self) -> Result<(), ServiceError> {
        let _names = self.member_names_guard()?;
        let _writes = lock(&self.writes)?;
        let log = self.store.load_all().map_err(PersistenceError::from)?;
        self.read_models.rebuild(&log)?;
        Ok(())
    }

    pub(crate) fn repository(&self) -> AggregateRepository<&S> {
        AggregateRepository::new(&self.store)
    }

    pub(crate) fn unit_of_work(&self) -> UnitOfWork<'_, S> {
        UnitOfWork::begin(&self.store)
    }

    pub(crate) fn member_names_guard(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        lock(&self.member_names)
    }

    /// Commit, update the read models, then publish.
    pub(crate) fn commit(&self, uow: UnitOfWork<'_, S>) -> Result<Vec<StoredEvent>, ServiceError> {
        let _writes = lock(&self.writes)?;
        let committed = uow.commit()?;

        for stored in &committed {
            let envelope = stored.to_envelope();
            self.read_models.apply(&envelope)?;
            self.bus
                .publish(envelope)
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }

    /// Run `attempt` again from scratch while it fails on an optimistic-concurrency
    /// conflict, at most `max_conflict_retries` extra times.
    pub(crate) fn retry_on_conflict<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(err) if err.is_concurrency_conflict() && retries < self.max_conflict_retries => {
                    retries += 1;
                    tracing::warn!(operation, retries, error = %err, "concurrency conflict, retrying");
                }
                result => return result,
            }
        }
    }
}

fn lock(mutex: &Mutex<()>) -> Result<MutexGuard<'_, ()>, ServiceError> {
    mutex
        .lock()
        .map_err(|_| ServiceError::Unavailable("lock poisoned".to_string()))
}
