//! Order line: one item, the price it sold for and how many.

use serde::{Deserialize, Serialize};

use shop_core::{DomainError, DomainResult, Entity, OrderItemId};
use shop_inventory::{Item, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderItemStatus {
    Active,
    Cancelled,
}

/// A snapshot of one product line within an order.
///
/// Only [`OrderItem::create`] builds one, and it reserves the stock as it does.
/// The item itself is referenced by id: it is shared with other orders and
/// outlives this line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    item_id: ItemId,
    /// Unit price at the time of the order.
    order_price: u64,
    count: u32,
    status: OrderItemStatus,
}

impl OrderItem {
    /// Reserve `count` units of `item` at `order_price` each.
    ///
    /// Fails with [`DomainError::NotEnoughStock`] if the item cannot cover the
    /// count; no line is produced and the item keeps its stock.
    pub fn create(item: &mut Item, order_price: u64, count: u32) -> DomainResult<Self> {
        item.remove_stock(count)?;

        Ok(Self {
            id: OrderItemId::new(),
            item_id: item.id_typed(),
            order_price,
            count,
            status: OrderItemStatus::Active,
        })
    }

    /// Return the reserved units to `item` and mark the line cancelled.
    ///
    /// A line is cancelled at most once; a second call fails without touching
    /// stock.
    pub fn cancel(&mut self, item: &mut Item) -> DomainResult<()> {
        if self.status == OrderItemStatus::Cancelled {
            return Err(DomainError::invariant("order item already cancelled"));
        }
        if item.id_typed() != self.item_id {
            return Err(DomainError::invariant("item does not match order item"));
        }

        item.add_stock(self.count)?;
        self.status = OrderItemStatus::Cancelled;
        Ok(())
    }

    /// Unit price times quantity.
    pub fn total_price(&self) -> u64 {
        self.order_price.saturating_mul(u64::from(self.count))
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn order_price(&self) -> u64 {
        self.order_price
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn status(&self) -> OrderItemStatus {
        self.status
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderItemStatus::Cancelled
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.status = OrderItemStatus::Cancelled;
    }
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::TrackedAggregate;
    use shop_inventory::ItemKind;

    fn test_item(stock: u32) -> Item {
        let mut item = Item::register(
            ItemId::generate(),
            "JPA BOOK",
            1_000,
            stock,
            ItemKind::Book {
                author: "Kim".to_string(),
                isbn: "1234".to_string(),
            },
        )
        .unwrap();
        item.take_pending_events();
        item
    }

    #[test]
    fn create_reserves_stock() {
        let mut item = test_item(10);

        let line = OrderItem::create(&mut item, 1_000, 3).unwrap();

        assert_eq!(item.stock(), 7);
        assert_eq!(line.count(), 3);
        assert_eq!(line.item_id(), item.id_typed());
        assert_eq!(line.status(), OrderItemStatus::Active);
        assert_eq!(line.total_price(), 3_000);
    }

    #[test]
    fn create_beyond_stock_fails_and_keeps_stock() {
        let mut item = test_item(2);

        let err = OrderItem::create(&mut item, 1_000, 3).unwrap_err();

        assert_eq!(err, DomainError::not_enough_stock(3, 2));
        assert_eq!(item.stock(), 2);
        assert!(item.pending_events().is_empty());
    }

    #[test]
    fn cancel_restores_stock_once() {
        let mut item = test_item(10);
        let mut line = OrderItem::create(&mut item, 1_000, 4).unwrap();

        line.cancel(&mut item).unwrap();
        assert_eq!(item.stock(), 10);
        assert!(line.is_cancelled());

        let err = line.cancel(&mut item).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("already cancelled") => {}
            _ => panic!("Expected InvariantViolation for double cancel"),
        }
        assert_eq!(item.stock(), 10);
    }

    #[test]
    fn cancel_against_another_item_is_rejected() {
        let mut item = test_item(10);
        let mut other = test_item(10);
        let mut line = OrderItem::create(&mut item, 1_000, 4).unwrap();

        assert!(matches!(
            line.cancel(&mut other),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(other.stock(), 10);
        assert!(!line.is_cancelled());
    }

    #[test]
    fn each_line_gets_its_own_id() {
        let mut item = test_item(10);
        let a = OrderItem::create(&mut item, 1_000, 1).unwrap();
        let b = OrderItem::create(&mut item, 1_000, 1).unwrap();
        assert_ne!(Entity::id(&a), Entity::id(&b));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: create then cancel leaves stock where it started.
            #[test]
            fn create_then_cancel_is_stock_neutral(
                (stock, count) in (1u32..50_000).prop_flat_map(|s| (Just(s), 1..=s)),
                price in 0u64..1_000_000
            ) {
                let mut item = test_item(stock);
                let mut line = OrderItem::create(&mut item, price, count).unwrap();
                prop_assert_eq!(item.stock(), stock - count);
                prop_assert_eq!(line.total_price(), price * u64::from(count));

                line.cancel(&mut item).unwrap();
                prop_assert_eq!(item.stock(), stock);
            }
        }
    }
}
