use shop_events::EventBus;
use shop_infra::event_store::EventStore;
use shop_infra::projections::ItemReadModel;
use shop_inventory::{Item, ItemId, ItemKind};

use super::{JsonEnvelope, ServiceError, Shop};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub kind: ItemKind,
}

/// Replacement values for an item's editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: String,
    pub price: u64,
    pub stock: u32,
}

pub struct ItemService<'a, S, B> {
    shop: &'a Shop<S, B>,
}

impl<'a, S, B> ItemService<'a, S, B>
where
    S: EventStore,
    B: EventBus<JsonEnvelope>,
{
    pub(crate) fn new(shop: &'a Shop<S, B>) -> Self {
        Self { shop }
    }

    pub fn save_item(&self, new_item: NewItem) -> Result<ItemId, ServiceError> {
        let item_id = ItemId::generate();
        let mut item = Item::register(item_id, new_item.name, new_item.price, new_item.stock, new_item.kind)?;

        let mut uow = self.shop.unit_of_work();
        uow.stage(&mut item)?;
        self.shop.commit(uow)?;

        tracing::info!(%item_id, name = item.name(), stock = item.stock(), "item saved");
        Ok(item_id)
    }

    pub fn update_item(&self, item_id: ItemId, update: ItemUpdate) -> Result<(), ServiceError> {
        self.shop.retry_on_conflict("item.update", || {
            let mut item = load_item(self.shop, item_id)?;
            item.update(update.name.clone(), update.price, update.stock)?;

            let mut uow = self.shop.unit_of_work();
            uow.stage(&mut item)?;
            self.shop.commit(uow)?;
            Ok(())
        })
    }

    pub fn find_items(&self) -> Vec<ItemReadModel> {
        self.shop.read_models().items.list()
    }

    pub fn find_one(&self, item_id: ItemId) -> Option<ItemReadModel> {
        self.shop.read_models().items.get(&item_id)
    }
}

pub(crate) fn load_item<S, B>(shop: &Shop<S, B>, item_id: ItemId) -> Result<Item, ServiceError>
where
    S: EventStore,
    B: EventBus<JsonEnvelope>,
{
    shop.repository()
        .load::<Item>(item_id)?
        .ok_or_else(|| ServiceError::not_found("item", item_id))
}
