//! Item catalogue projection: current price and stock per item.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use shop_core::Aggregate;
use shop_events::EventEnvelope;
use shop_inventory::{InventoryEvent, Item, ItemId, ItemKind};

use super::{Projection, ProjectionError, StreamCursors, decode};
use crate::read_model::ReadModelStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReadModel {
    pub item_id: ItemId,
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub kind: Option<ItemKind>,
}

#[derive(Debug)]
pub struct ItemsProjection<S> {
    store: S,
    cursors: StreamCursors,
}

impl<S> ItemsProjection<S>
where
    S: ReadModelStore<ItemId, ItemReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, item_id: &ItemId) -> Option<ItemReadModel> {
        self.store.get(item_id)
    }

    pub fn list(&self) -> Vec<ItemReadModel> {
        self.store.list()
    }

    fn apply_event(&self, event: InventoryEvent) {
        match event {
            InventoryEvent::ItemRegistered(e) => {
                self.store.upsert(
                    e.item_id,
                    ItemReadModel {
                        item_id: e.item_id,
                        name: e.name,
                        price: e.price,
                        stock: e.stock,
                        kind: Some(e.kind),
                    },
                );
            }
            InventoryEvent::ItemUpdated(e) => {
                if let Some(mut rm) = self.store.get(&e.item_id) {
                    rm.name = e.name;
                    rm.price = e.price;
                    rm.stock = e.stock;
                    self.store.upsert(e.item_id, rm);
                }
            }
            InventoryEvent::StockRemoved(e) => {
                if let Some(mut rm) = self.store.get(&e.item_id) {
                    rm.stock = rm.stock.saturating_sub(e.count);
                    self.store.upsert(e.item_id, rm);
                }
            }
            InventoryEvent::StockAdded(e) => {
                if let Some(mut rm) = self.store.get(&e.item_id) {
                    rm.stock = rm.stock.saturating_add(e.count);
                    self.store.upsert(e.item_id, rm);
                }
            }
        }
    }
}

impl<S> Projection for ItemsProjection<S>
where
    S: ReadModelStore<ItemId, ItemReadModel>,
{
    fn aggregate_type(&self) -> &'static str {
        Item::AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != self.aggregate_type() {
            return Ok(());
        }

        self.cursors
            .advance(envelope.aggregate_id(), envelope.sequence_number(), || {
                let event: InventoryEvent = decode(envelope)?;
                if event.item_id().0 != envelope.aggregate_id() {
                    return Err(ProjectionError::StreamMismatch(
                        "event item_id does not match envelope aggregate_id".to_string(),
                    ));
                }
                self.apply_event(event);
                Ok(())
            })
            .map(|_| ())
    }

    fn reset(&self) {
        self.cursors.clear();
        self.store.clear();
    }
}
