use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shop_core::{Aggregate, AggregateRoot, DomainError, DomainResult, TrackedAggregate};
use shop_events::Event;

shop_core::aggregate_id!(
    /// Item identifier.
    ItemId
);

/// What kind of product an item is, with the attributes specific to that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Book { author: String, isbn: String },
    Album { artist: String, etc: String },
    Movie { director: String, actor: String },
}

/// Aggregate root: Item.
///
/// Owns the stock count. Stock never goes negative: `remove_stock` refuses any
/// request larger than what is on hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    name: String,
    /// Unit price in the smallest currency unit.
    price: u64,
    stock: u32,
    kind: Option<ItemKind>,
    version: u64,
    created: bool,
    pending: Vec<InventoryEvent>,
}

impl Item {
    /// Register a brand-new item. The registration is pending until committed.
    pub fn register(
        item_id: ItemId,
        name: impl Into<String>,
        price: u64,
        stock: u32,
        kind: ItemKind,
    ) -> DomainResult<Self> {
        let mut item = Self::empty(item_id);
        item.record(InventoryCommand::RegisterItem(RegisterItem {
            item_id,
            name: name.into(),
            price,
            stock,
            kind,
            occurred_at: Utc::now(),
        }))?;
        Ok(item)
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn kind(&self) -> Option<&ItemKind> {
        self.kind.as_ref()
    }

    /// Reserve `count` units.
    ///
    /// Fails with [`DomainError::NotEnoughStock`] when `count` exceeds the stock
    /// on hand; nothing changes in that case.
    pub fn remove_stock(&mut self, count: u32) -> DomainResult<()> {
        self.record(InventoryCommand::RemoveStock(RemoveStock {
            item_id: self.id,
            count,
            occurred_at: Utc::now(),
        }))
    }

    /// Return `count` units to stock.
    pub fn add_stock(&mut self, count: u32) -> DomainResult<()> {
        self.record(InventoryCommand::AddStock(AddStock {
            item_id: self.id,
            count,
            occurred_at: Utc::now(),
        }))
    }

    /// Overwrite the catalog details (name, price, stock on hand).
    pub fn update(&mut self, name: impl Into<String>, price: u64, stock: u32) -> DomainResult<()> {
        self.record(InventoryCommand::UpdateItem(UpdateItem {
            item_id: self.id,
            name: name.into(),
            price,
            stock,
            occurred_at: Utc::now(),
        }))
    }

    fn record(&mut self, command: InventoryCommand) -> DomainResult<()> {
        let events = self.execute(&command)?;
        self.pending.extend(events);
        Ok(())
    }
}

impl AggregateRoot for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterItem {
    pub item_id: ItemId,
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub kind: ItemKind,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub item_id: ItemId,
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveStock {
    pub item_id: ItemId,
    pub count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStock {
    pub item_id: ItemId,
    pub count: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    RegisterItem(RegisterItem),
    UpdateItem(UpdateItem),
    RemoveStock(RemoveStock),
    AddStock(AddStock),
}

/// Event: ItemRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRegistered {
    pub item_id: ItemId,
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub kind: ItemKind,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub item_id: ItemId,
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRemoved {
    pub item_id: ItemId,
    pub count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdded {
    pub item_id: ItemId,
    pub count: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemRegistered(ItemRegistered),
    ItemUpdated(ItemUpdated),
    StockRemoved(StockRemoved),
    StockAdded(StockAdded),
}

impl InventoryEvent {
    pub fn item_id(&self) -> ItemId {
        match self {
            InventoryEvent::ItemRegistered(e) => e.item_id,
            InventoryEvent::ItemUpdated(e) => e.item_id,
            InventoryEvent::StockRemoved(e) => e.item_id,
            InventoryEvent::StockAdded(e) => e.item_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemRegistered(_) => "inventory.item.registered",
            InventoryEvent::ItemUpdated(_) => "inventory.item.updated",
            InventoryEvent::StockRemoved(_) => "inventory.item.stock_removed",
            InventoryEvent::StockAdded(_) => "inventory.item.stock_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemRegistered(e) => e.occurred_at,
            InventoryEvent::ItemUpdated(e) => e.occurred_at,
            InventoryEvent::StockRemoved(e) => e.occurred_at,
            InventoryEvent::StockAdded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Item {
    const AGGREGATE_TYPE: &'static str = "inventory.item";

    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn empty(id: ItemId) -> Self {
        Self {
            id,
            name: String::new(),
            price: 0,
            stock: 0,
            kind: None,
            version: 0,
            created: false,
            pending: Vec::new(),
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemRegistered(e) => {
                self.id = e.item_id;
                self.name = e.name.clone();
                self.price = e.price;
                self.stock = e.stock;
                self.kind = Some(e.kind.clone());
                self.created = true;
            }
            InventoryEvent::ItemUpdated(e) => {
                self.name = e.name.clone();
                self.price = e.price;
                self.stock = e.stock;
            }
            InventoryEvent::StockRemoved(e) => {
                self.stock = self.stock.saturating_sub(e.count);
            }
            InventoryEvent::StockAdded(e) => {
                self.stock = self.stock.saturating_add(e.count);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::RegisterItem(cmd) => self.handle_register(cmd),
            InventoryCommand::UpdateItem(cmd) => self.handle_update(cmd),
            InventoryCommand::RemoveStock(cmd) => self.handle_remove(cmd),
            InventoryCommand::AddStock(cmd) => self.handle_add(cmd),
        }
    }
}

impl TrackedAggregate for Item {
    fn pending_events(&self) -> &[InventoryEvent] {
        &self.pending
    }

    fn take_pending_events(&mut self) -> Vec<InventoryEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl Item {
    fn ensure_created(&self, item_id: ItemId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(vec![InventoryEvent::ItemRegistered(ItemRegistered {
            item_id: cmd.item_id,
            name: cmd.name.clone(),
            price: cmd.price,
            stock: cmd.stock,
            kind: cmd.kind.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created(cmd.item_id)?;
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(vec![InventoryEvent::ItemUpdated(ItemUpdated {
            item_id: cmd.item_id,
            name: cmd.name.clone(),
            price: cmd.price,
            stock: cmd.stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveStock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created(cmd.item_id)?;
        if cmd.count == 0 {
            return Err(DomainError::validation("count must be positive"));
        }
        if cmd.count > self.stock {
            return Err(DomainError::not_enough_stock(cmd.count, self.stock));
        }
        Ok(vec![InventoryEvent::StockRemoved(StockRemoved {
            item_id: cmd.item_id,
            count: cmd.count,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add(&self, cmd: &AddStock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_created(cmd.item_id)?;
        if cmd.count == 0 {
            return Err(DomainError::validation("count must be positive"));
        }
        if self.stock.checked_add(cmd.count).is_none() {
            return Err(DomainError::invariant("stock overflow"));
        }
        Ok(vec![InventoryEvent::StockAdded(StockAdded {
            item_id: cmd.item_id,
            count: cmd.count,
            occurred_at: cmd.occurred_at,
        })])
    }
}
