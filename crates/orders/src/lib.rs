//! Orders domain module (event-sourced).
//!
//! An order belongs to one member, ships to one address and holds one or more
//! order lines. Creating a line reserves stock on the referenced item; cancelling
//! returns it.

pub mod delivery;
pub mod order;
pub mod order_item;

pub use delivery::{Delivery, DeliveryStatus};
pub use order::{
    CancelOrder, CompleteDelivery, DeliveryCompleted, Order, OrderCancelled, OrderCommand,
    OrderEvent, OrderId, OrderPlaced, OrderStatus, PlaceOrder,
};
pub use order_item::{OrderItem, OrderItemStatus};
