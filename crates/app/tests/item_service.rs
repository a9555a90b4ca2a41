use shop_app::InMemoryShop;
use shop_app::ServiceError;
use shop_app::services::{ItemUpdate, NewItem};
use shop_core::DomainError;
use shop_inventory::{ItemId, ItemKind};

fn album() -> NewItem {
    NewItem {
        name: "Abbey Road".to_string(),
        price: 30_000,
        stock: 5,
        kind: ItemKind::Album {
            artist: "The Beatles".to_string(),
            etc: "remastered".to_string(),
        },
    }
}

#[test]
fn saved_item_appears_in_catalogue() {
    let shop = InMemoryShop::in_memory(3);

    let item_id = shop.items().save_item(album()).unwrap();

    let item = shop.items().find_one(item_id).unwrap();
    assert_eq!(item.name, "Abbey Road");
    assert_eq!(item.price, 30_000);
    assert_eq!(item.stock, 5);
    assert_eq!(item.kind.as_ref().map(ItemKind::label), Some("album"));
    assert_eq!(shop.items().find_items().len(), 1);
}

#[test]
fn update_replaces_name_price_and_stock() {
    let shop = InMemoryShop::in_memory(3);
    let item_id = shop.items().save_item(album()).unwrap();

    shop.items()
        .update_item(
            item_id,
            ItemUpdate {
                name: "Let It Be".to_string(),
                price: 25_000,
                stock: 9,
            },
        )
        .unwrap();

    let item = shop.items().find_one(item_id).unwrap();
    assert_eq!((item.name.as_str(), item.price, item.stock), ("Let It Be", 25_000, 9));
}

#[test]
fn item_without_name_is_rejected() {
    let shop = InMemoryShop::in_memory(3);
    let err = shop
        .items()
        .save_item(NewItem {
            name: String::new(),
            ..album()
        })
        .unwrap_err();

    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert!(shop.items().find_items().is_empty());
}

#[test]
fn updating_unknown_item_is_not_found() {
    let shop = InMemoryShop::in_memory(3);
    let err = shop
        .items()
        .update_item(
            ItemId::generate(),
            ItemUpdate {
                name: "x".to_string(),
                price: 1,
                stock: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
