//! Inventory domain module (event-sourced).
//!
//! Items for sale and their stock. Pure domain logic: no IO, no storage.

pub mod item;

pub use item::{
    AddStock, InventoryCommand, InventoryEvent, Item, ItemId, ItemKind, ItemRegistered,
    ItemUpdated, RegisterItem, RemoveStock, StockAdded, StockRemoved, UpdateItem,
};
