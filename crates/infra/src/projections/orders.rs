use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use shop_core::Aggregate;
use shop_events::EventEnvelope;
use shop_inventory::ItemId;
use shop_members::{Address, MemberId};
use shop_orders::{DeliveryStatus, Order, OrderEvent, OrderId, OrderItemStatus, OrderStatus};

use super::{Projection, ProjectionError, StreamCursors, decode};
use crate::read_model::ReadModelStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineReadModel {
    pub item_id: ItemId,
    pub order_price: u64,
    pub count: u32,
    pub total_price: u64,
    pub status: OrderItemStatus,
}

/// Queryable order summary.
///
/// Holds the member id only; callers join member names at query time so a
/// rename shows up without touching orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReadModel {
    pub order_id: OrderId,
    pub member_id: MemberId,
    pub delivery_address: Address,
    pub delivery_status: DeliveryStatus,
    pub status: OrderStatus,
    pub lines: Vec<OrderLineReadModel>,
    pub total_price: u64,
    pub ordered_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct OrdersProjection<S> {
    store: S,
    cursors: StreamCursors,
}

impl<S> OrdersProjection<S>
where
    S: ReadModelStore<OrderId, OrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, order_id: &OrderId) -> Option<OrderReadModel> {
        self.store.get(order_id)
    }

    pub fn list(&self) -> Vec<OrderReadModel> {
        self.store.list()
    }

    fn apply_event(&self, event: OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                let lines: Vec<OrderLineReadModel> = e
                    .lines
                    .iter()
                    .map(|line| OrderLineReadModel {
                        item_id: line.item_id(),
                        order_price: line.order_price(),
                        count: line.count(),
                        total_price: line.total_price(),
                        status: line.status(),
                    })
                    .collect();
                let total_price = lines
                    .iter()
                    .fold(0u64, |acc, l| acc.saturating_add(l.total_price));

                self.store.upsert(
                    e.order_id,
                    OrderReadModel {
                        order_id: e.order_id,
                        member_id: e.member_id,
                        delivery_address: e.delivery_address,
                        delivery_status: DeliveryStatus::Ready,
                        status: OrderStatus::Ordered,
                        lines,
                        total_price,
                        ordered_at: e.occurred_at,
                    },
                );
            }
            OrderEvent::OrderCancelled(e) => {
                if let Some(mut rm) = self.store.get(&e.order_id) {
                    rm.status = OrderStatus::Cancelled;
                    for line in &mut rm.lines {
                        line.status = OrderItemStatus::Cancelled;
                    }
                    self.store.upsert(e.order_id, rm);
                }
            }
            OrderEvent::DeliveryCompleted(e) => {
                if let Some(mut rm) = self.store.get(&e.order_id) {
                    rm.delivery_status = DeliveryStatus::Completed;
                    self.store.upsert(e.order_id, rm);
                }
            }
        }
    }
}

impl<S> Projection for OrdersProjection<S>
where
    S: ReadModelStore<OrderId, OrderReadModel>,
{
    fn aggregate_type(&self) -> &'static str {
        Order::AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != self.aggregate_type() {
            return Ok(());
        }

        self.cursors
            .advance(envelope.aggregate_id(), envelope.sequence_number(), || {
                let event: OrderEvent = decode(envelope)?;
                if event.order_id().0 != envelope.aggregate_id() {
                    return Err(ProjectionError::StreamMismatch(
                        "event order_id does not match envelope aggregate_id".to_string(),
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
