use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shop_core::{Aggregate, AggregateRoot, DomainError, DomainResult, TrackedAggregate};
use shop_events::Event;
use shop_inventory::Item;
use shop_members::{Address, MemberId};

use crate::delivery::Delivery;
use crate::order_item::OrderItem;

shop_core::aggregate_id!(
    /// Order identifier.
    OrderId
);

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Ordered,
    Cancelled,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    member_id: Option<MemberId>,
    delivery: Option<Delivery>,
    lines: Vec<OrderItem>,
    status: OrderStatus,
    ordered_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    pending: Vec<OrderEvent>,
}

impl Order {
    /// Place an order for `member_id` shipping to `delivery_address`.
    ///
    /// The lines already hold their stock reservations (see
    /// [`OrderItem::create`]).
    pub fn place(
        order_id: OrderId,
        member_id: MemberId,
        delivery_address: Address,
        lines: Vec<OrderItem>,
    ) -> DomainResult<Self> {
        let mut order = Self::empty(order_id);
        order.record(OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            member_id,
            delivery_address,
            lines,
            occurred_at: Utc::now(),
        }))?;
        Ok(order)
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn member_id(&self) -> Option<MemberId> {
        self.member_id
    }

    pub fn delivery(&self) -> Option<&Delivery> {
        self.delivery.as_ref()
    }

    pub fn lines(&self) -> &[OrderItem] {
        &self.lines
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn ordered_at(&self) -> Option<DateTime<Utc>> {
        self.ordered_at
    }

    /// Sum of every line's total.
    pub fn total_price(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, line| acc.saturating_add(line.total_price()))
    }

    /// Cancel the order and return every line's stock to its item.
    ///
    /// `items` must contain the item of every line. A delivered or already
    /// cancelled order is rejected before any stock moves.
    pub fn cancel(&mut self, items: &mut [Item]) -> DomainResult<()> {
        let command = OrderCommand::CancelOrder(CancelOrder {
            order_id: self.id,
            occurred_at: Utc::now(),
        });
        let events = self.handle(&command)?;

        if let Some(missing) = self
            .lines
            .iter()
            .find(|line| !items.iter().any(|i| i.id_typed() == line.item_id()))
        {
            return Err(DomainError::validation(format!(
                "item {} of the order was not supplied",
                missing.item_id()
            )));
        }

        // Restore on copies so a failing line leaves every item untouched.
        let mut restored = items.to_vec();
        let mut lines = self.lines.clone();
        for line in &mut lines {
            if let Some(item) = restored.iter_mut().find(|i| i.id_typed() == line.item_id()) {
                line.cancel(item)?;
            }
        }
        items.clone_from_slice(&restored);

        for event in &events {
            self.apply(event);
        }
        self.pending.extend(events);
        Ok(())
    }

    /// Mark the delivery as shipped. A completed delivery can no longer be cancelled.
    pub fn complete_delivery(&mut self) -> DomainResult<()> {
        self.record(OrderCommand::CompleteDelivery(CompleteDelivery {
            order_id: self.id,
            occurred_at: Utc::now(),
        }))
    }

    fn record(&mut self, command: OrderCommand) -> DomainResult<()> {
        let events = self.execute(&command)?;
        self.pending.extend(events);
        Ok(())
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub member_id: MemberId,
    pub delivery_address: Address,
    pub lines: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteDelivery {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    CancelOrder(CancelOrder),
    CompleteDelivery(CompleteDelivery),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub member_id: MemberId,
    pub delivery_address: Address,
    pub lines: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCompleted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderCancelled(OrderCancelled),
    DeliveryCompleted(DeliveryCompleted),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
            OrderEvent::DeliveryCompleted(e) => e.order_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::OrderCancelled(_) => "orders.order.cancelled",
            OrderEvent::DeliveryCompleted(_) => "orders.order.delivery_completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
            OrderEvent::DeliveryCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    const AGGREGATE_TYPE: &'static str = "orders.order";

    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn empty(id: OrderId) -> Self {
        Self {
            id,
            member_id: None,
            delivery: None,
            lines: Vec::new(),
            status: OrderStatus::Ordered,
            ordered_at: None,
            version: 0,
            created: false,
            pending: Vec::new(),
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.member_id = Some(e.member_id);
                self.delivery = Some(Delivery::ready(e.delivery_address.clone()));
                self.lines = e.lines.clone();
                self.status = OrderStatus::Ordered;
                self.ordered_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
                for line in &mut self.lines {
                    line.mark_cancelled();
                }
            }
            OrderEvent::DeliveryCompleted(_) => {
                if let Some(delivery) = self.delivery.as_mut() {
                    delivery.complete();
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
            OrderCommand::CompleteDelivery(cmd) => self.handle_complete_delivery(cmd),
        }
    }
}

impl TrackedAggregate for Order {
    fn pending_events(&self) -> &[OrderEvent] {
        &self.pending
    }

    fn take_pending_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn is_delivered(&self) -> bool {
        self.delivery.as_ref().is_some_and(Delivery::is_completed)
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("an order needs at least one line"));
        }
        if cmd.lines.iter().any(OrderItem::is_cancelled) {
            return Err(DomainError::invariant("cannot place an order with cancelled lines"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            member_id: cmd.member_id,
            delivery_address: cmd.delivery_address.clone(),
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;

        if self.is_delivered() {
            return Err(DomainError::invariant("delivered orders cannot be cancelled"));
        }
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invariant("order already cancelled"));
        }

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete_delivery(
        &self,
        cmd: &CompleteDelivery,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;

        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invariant("cannot deliver a cancelled order"));
        }
        if self.is_delivered() {
            return Err(DomainError::invariant("delivery already completed"));
        }

        Ok(vec![OrderEvent::DeliveryCompleted(DeliveryCompleted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
