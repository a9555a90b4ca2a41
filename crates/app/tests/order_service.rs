use std::sync::{Arc, Barrier};
use std::thread;

use shop_app::services::{NewItem, NewMember, OrderLineRequest, OrderSearch};
use shop_app::{InMemoryShop, ServiceError};
use shop_core::{AggregateRoot, DomainError, TrackedAggregate};
use shop_infra::AggregateRepository;
use shop_infra::event_store::EventStore;
use shop_inventory::{Item, ItemId, ItemKind};
use shop_members::{Address, MemberId};
use shop_orders::{DeliveryStatus, Order, OrderId, OrderItemStatus, OrderStatus};

struct Fixture {
    shop: InMemoryShop,
    member_id: MemberId,
}

fn fixture() -> Fixture {
    let shop = InMemoryShop::in_memory(3);
    let member_id = shop
        .members()
        .join(NewMember::new(
            "member1",
            Some(Address::new("Seoul", "River", "123-123").unwrap()),
        ))
        .unwrap();
    Fixture { shop, member_id }
}

fn create_book(shop: &InMemoryShop, name: &str, price: u64, stock: u32) -> ItemId {
    shop.items()
        .save_item(NewItem {
            name: name.to_string(),
            price,
            stock,
            kind: ItemKind::Book {
                author: "Kim".to_string(),
                isbn: "1234".to_string(),
            },
        })
        .unwrap()
}

#[test]
fn ordering_reserves_stock_and_snapshots_price() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);

    let order_id = shop.orders().order(member_id, book, 2).unwrap();

    let order = shop.orders().find_one(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Ordered);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].order_price, 10_000);
    assert_eq!(order.total_price, 20_000);
    assert_eq!(order.delivery_status, DeliveryStatus::Ready);
    assert_eq!(order.delivery_address.city(), "Seoul");
    assert_eq!(shop.items().find_one(book).unwrap().stock, 8);
}

#[test]
fn ordering_beyond_stock_fails_and_commits_nothing() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);
    let events_before = shop.store().load_all().unwrap().len();

    let err = shop.orders().order(member_id, book, 11).unwrap_err();

    match err {
        ServiceError::Domain(DomainError::NotEnoughStock { requested, available }) => {
            assert_eq!((requested, available), (11, 10));
        }
        _ => panic!("Expected NotEnoughStock"),
    }
    assert_eq!(shop.items().find_one(book).unwrap().stock, 10);
    assert!(shop.orders().find_orders(&OrderSearch::default()).is_empty());
    assert_eq!(shop.store().load_all().unwrap().len(), events_before);
}

#[test]
fn multi_line_order_is_all_or_nothing() {
    let Fixture { shop, member_id } = fixture();
    let plenty = create_book(&shop, "JPA1 BOOK", 10_000, 100);
    let scarce = create_book(&shop, "JPA2 BOOK", 20_000, 1);

    let err = shop
        .orders()
        .order_lines(
            member_id,
            &[
                OrderLineRequest { item_id: plenty, count: 5 },
                OrderLineRequest { item_id: scarce, count: 2 },
            ],
        )
        .unwrap_err();

    assert!(matches!(err, ServiceError::Domain(DomainError::NotEnoughStock { .. })));
    assert_eq!(shop.items().find_one(plenty).unwrap().stock, 100);
    assert_eq!(shop.items().find_one(scarce).unwrap().stock, 1);
}

#[test]
fn two_lines_on_the_same_item_reserve_from_one_stock() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "JPA1 BOOK", 10_000, 10);

    shop.orders()
        .order_lines(
            member_id,
            &[
                OrderLineRequest { item_id: book, count: 3 },
                OrderLineRequest { item_id: book, count: 4 },
            ],
        )
        .unwrap();

    assert_eq!(shop.items().find_one(book).unwrap().stock, 3);
}

#[test]
fn cancelling_restores_stock_and_marks_order_cancelled() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);
    let order_id = shop.orders().order(member_id, book, 2).unwrap();

    shop.orders().cancel_order(order_id).unwrap();

    let order = shop.orders().find_one(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.lines.iter().all(|l| l.status == OrderItemStatus::Cancelled));
    assert_eq!(shop.items().find_one(book).unwrap().stock, 10);
}

#[test]
fn cancelling_twice_fails_and_restores_stock_once() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);
    let order_id = shop.orders().order(member_id, book, 2).unwrap();
    shop.orders().cancel_order(order_id).unwrap();

    let err = shop.orders().cancel_order(order_id).unwrap_err();

    assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));
    assert_eq!(shop.items().find_one(book).unwrap().stock, 10);
}

#[test]
fn delivered_order_cannot_be_cancelled() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);
    let order_id = shop.orders().order(member_id, book, 2).unwrap();
    shop.orders().complete_delivery(order_id).unwrap();

    let err = shop.orders().cancel_order(order_id).unwrap_err();

    match err {
        ServiceError::Domain(DomainError::InvariantViolation(msg)) => {
            assert_eq!(msg, "delivered orders cannot be cancelled");
        }
        _ => panic!("Expected InvariantViolation"),
    }
    let order = shop.orders().find_one(order_id).unwrap();
    assert_eq!(order.delivery_status, DeliveryStatus::Completed);
    assert_eq!(order.status, OrderStatus::Ordered);
    assert_eq!(shop.items().find_one(book).unwrap().stock, 8);
}

#[test]
fn member_without_address_cannot_order() {
    let Fixture { shop, .. } = fixture();
    let homeless = shop.members().join(NewMember::new("nomad", None)).unwrap();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);

    let err = shop.orders().order(homeless, book, 1).unwrap_err();

    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    assert_eq!(shop.items().find_one(book).unwrap().stock, 10);
}

#[test]
fn unknown_member_or_item_is_not_found() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);

    assert!(matches!(
        shop.orders().order(MemberId::generate(), book, 1),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        shop.orders().order(member_id, ItemId::generate(), 1),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        shop.orders().cancel_order(OrderId::generate()),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn find_orders_filters_by_member_name_and_status() {
    let Fixture { shop, member_id } = fixture();
    let other = shop
        .members()
        .join(NewMember::new(
            "someone-else",
            Some(Address::new("Busan", "Sea", "2222").unwrap()),
        ))
        .unwrap();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);
    let first = shop.orders().order(member_id, book, 1).unwrap();
    let second = shop.orders().order(member_id, book, 1).unwrap();
    shop.orders().order(other, book, 1).unwrap();
    shop.orders().cancel_order(second).unwrap();

    let by_name = shop.orders().find_orders(&OrderSearch {
        member_name: Some("member".to_string()),
        status: None,
    });
    assert_eq!(by_name.len(), 2);

    let ordered_by_name = shop.orders().find_orders(&OrderSearch {
        member_name: Some("member1".to_string()),
        status: Some(OrderStatus::Ordered),
    });
    assert_eq!(ordered_by_name.len(), 1);
    assert_eq!(ordered_by_name[0].order_id, first);

    assert_eq!(shop.orders().find_orders(&OrderSearch::default()).len(), 3);
}

#[test]
fn rebuilt_aggregates_and_read_models_match_live_state() {
    let Fixture { shop, member_id } = fixture();
    let book = create_book(&shop, "Sigol JPA", 10_000, 10);
    let order_id = shop.orders().order(member_id, book, 3).unwrap();
    shop.orders().cancel_order(order_id).unwrap();

    let repo = AggregateRepository::new(shop.store());
    let order = repo.load::<Order>(order_id).unwrap().unwrap();
    let item = repo.load::<Item>(book).unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(order.version(), 2);
    assert!(order.pending_events().is_empty());
    assert_eq!(item.stock(), 10);

    let before = shop.orders().find_one(order_id);
    shop.rebuild_read_models().unwrap();
    assert_eq!(shop.orders().find_one(order_id), before);
    assert_eq!(shop.items().find_one(book).unwrap().stock, 10);
}

#[test]
fn concurrent_orders_never_oversell() {
    let shop = Arc::new(InMemoryShop::in_memory(50));
    let member_id = shop
        .members()
        .join(NewMember::new(
            "buyer",
            Some(Address::new("Seoul", "River", "1").unwrap()),
        ))
        .unwrap();
    let book = create_book(&shop, "Hot Book", 1_000, 5);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shop = shop.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                shop.orders().order(member_id, book, 1)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let placed = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(placed, 5);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::Domain(DomainError::NotEnoughStock { .. }))));
    assert_eq!(shop.items().find_one(book).unwrap().stock, 0);
}
