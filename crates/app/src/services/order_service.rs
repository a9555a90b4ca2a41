use shop_core::DomainError;
use shop_events::EventBus;
use shop_infra::event_store::EventStore;
use shop_infra::projections::OrderReadModel;
use shop_inventory::{Item, ItemId};
use shop_members::{Member, MemberId};
use shop_orders::{Order, OrderId, OrderItem, OrderStatus};

use super::item_service::load_item;
use super::{JsonEnvelope, ServiceError, Shop};

/// One requested line: which item and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub item_id: ItemId,
    pub count: u32,
}

/// Filters for [`OrderService::find_orders`]. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSearch {
    /// Substring of the ordering member's current name.
    pub member_name: Option<String>,
    pub status: Option<OrderStatus>,
}

/// Placing, cancelling and shipping orders.
///
/// An order touches the order stream and every item stream it reserves from.
/// They are committed together; when another request changed one of the
/// items first, the whole operation is reloaded and redone.
pub struct OrderService<'a, S, B> {
    shop: &'a Shop<S, B>,
}

impl<'a, S, B> OrderService<'a, S, B>
where
    S: EventStore,
    B: EventBus<JsonEnvelope>,
{
    pub(crate) fn new(shop: &'a Shop<S, B>) -> Self {
        Self { shop }
    }

    /// Order `count` units of a single item.
    pub fn order(&self, member_id: MemberId, item_id: ItemId, count: u32) -> Result<OrderId, ServiceError> {
        self.order_lines(member_id, &[OrderLineRequest { item_id, count }])
    }

    /// Place one order with several lines, shipped to the member's address.
    ///
    /// Each line snapshots the item's current price. If any line cannot be
    /// covered by stock, nothing is committed.
    pub fn order_lines(&self, member_id: MemberId, requests: &[OrderLineRequest]) -> Result<OrderId, ServiceError> {
        let order_id = self.shop.retry_on_conflict("order.place", || {
            let member = self
                .shop
                .repository()
                .load::<Member>(member_id)?
                .ok_or_else(|| ServiceError::not_found("member", member_id))?;
            let address = member
                .address()
                .cloned()
                .ok_or_else(|| DomainError::validation("member has no delivery address"))?;

            let mut items = self.load_items(requests.iter().map(|r| r.item_id))?;
            let mut lines = Vec::with_capacity(requests.len());
            for request in requests {
                let item = find_item(&mut items, request.item_id)?;
                let price = item.price();
                lines.push(OrderItem::create(item, price, request.count)?);
            }

            let order_id = OrderId::generate();
            let mut order = Order::place(order_id, member_id, address, lines)?;

            let mut uow = self.shop.unit_of_work();
            uow.stage(&mut order)?;
            for item in &mut items {
                uow.stage(item)?;
            }
            self.shop.commit(uow)?;
            Ok(order_id)
        })?;

        tracing::info!(%order_id, %member_id, lines = requests.len(), "order placed");
        Ok(order_id)
    }

    /// Cancel an order and return its stock. Fails once the delivery is completed.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<(), ServiceError> {
        self.shop.retry_on_conflict("order.cancel", || {
            let mut order = self.load_order(order_id)?;
            let mut items = self.load_items(order.lines().iter().map(OrderItem::item_id))?;

            order.cancel(&mut items)?;

            let mut uow = self.shop.unit_of_work();
            uow.stage(&mut order)?;
            for item in &mut items {
                uow.stage(item)?;
            }
            self.shop.commit(uow)?;
            Ok(())
        })?;

        tracing::info!(%order_id, "order cancelled");
        Ok(())
    }

    pub fn complete_delivery(&self, order_id: OrderId) -> Result<(), ServiceError> {
        self.shop.retry_on_conflict("order.complete_delivery", || {
            let mut order = self.load_order(order_id)?;
            order.complete_delivery()?;

            let mut uow = self.shop.unit_of_work();
            uow.stage(&mut order)?;
            self.shop.commit(uow)?;
            Ok(())
        })?;

        tracing::info!(%order_id, "delivery completed");
        Ok(())
    }

    pub fn find_orders(&self, search: &OrderSearch) -> Vec<OrderReadModel> {
        let read_models = self.shop.read_models();

        read_models
            .orders
            .list()
            .into_iter()
            .filter(|o| search.status.is_none_or(|status| o.status == status))
            .filter(|o| match &search.member_name {
                None => true,
                Some(fragment) => read_models
                    .members
                    .get(&o.member_id)
                    .is_some_and(|m| m.name.contains(fragment.as_str())),
            })
            .collect()
    }

    pub fn find_one(&self, order_id: OrderId) -> Option<OrderReadModel> {
        self.shop.read_models().orders.get(&order_id)
    }

    fn load_order(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.shop
            .repository()
            .load::<Order>(order_id)?
            .ok_or_else(|| ServiceError::not_found("order", order_id))
    }

    /// Load each distinct item once, in first-seen order.
    fn load_items(&self, ids: impl Iterator<Item = ItemId>) -> Result<Vec<Item>, ServiceError> {
        let mut items: Vec<Item> = Vec::new();
        for item_id in ids {
            if items.iter().any(|i| i.id_typed() == item_id) {
                continue;
            }
            items.push(load_item(self.shop, item_id)?);
        }
        Ok(items)
    }
}

fn find_item(items: &mut [Item], item_id: ItemId) -> Result<&mut Item, ServiceError> {
    items
        .iter_mut()
        .find(|i| i.id_typed() == item_id)
        .ok_or_else(|| ServiceError::not_found("item", item_id))
}
