use std::sync::{Arc, Barrier};
use std::thread;

use shop_app::{InMemoryShop, ServiceError};
use shop_app::services::NewMember;
use shop_core::DomainError;
use shop_members::{Address, MemberId};

fn seoul() -> Address {
    Address::new("Seoul", "Gangnam-daero 1", "06000").unwrap()
}

#[test]
fn join_registers_member_in_directory() {
    let shop = InMemoryShop::in_memory(3);

    let member_id = shop.members().join(NewMember::new("soo", Some(seoul()))).unwrap();

    let member = shop.members().find_one(member_id).unwrap();
    assert_eq!(member.name, "soo");
    assert_eq!(member.address, Some(seoul()));
    assert_eq!(shop.members().find_members().len(), 1);
}

#[test]
fn member_without_address_can_join() {
    let shop = InMemoryShop::in_memory(3);
    let member_id = shop.members().join(NewMember::new("soo", None)).unwrap();
    assert_eq!(shop.members().find_one(member_id).unwrap().address, None);
}

#[test]
fn duplicate_name_is_rejected_with_fixed_message() {
    let shop = InMemoryShop::in_memory(3);
    shop.members().join(NewMember::new("soo1", None)).unwrap();

    let err = shop.members().join(NewMember::new("soo1", None)).unwrap_err();

    match &err {
        ServiceError::Domain(DomainError::DuplicateMember) => {}
        _ => panic!("Expected DuplicateMember"),
    }
    assert_eq!(err.to_string(), "member already exists");
    assert_eq!(shop.members().find_members().len(), 1);
}

#[test]
fn concurrent_joins_with_one_name_register_once() {
    let shop = Arc::new(InMemoryShop::in_memory(3));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shop = shop.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                shop.members().join(NewMember::new("same-name", None))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::Domain(DomainError::DuplicateMember))));
    assert_eq!(shop.members().find_members().len(), 1);
}

#[test]
fn joins_during_read_model_rebuild_keep_names_unique() {
    let shop = Arc::new(InMemoryShop::in_memory(3));
    for i in 0..500 {
        shop.members().join(NewMember::new(format!("filler-{i}"), None)).unwrap();
    }
    shop.members().join(NewMember::new("kim", None)).unwrap();

    let rebuilder = {
        let shop = shop.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                shop.rebuild_read_models().unwrap();
            }
        })
    };
    let joiner = {
        let shop = shop.clone();
        thread::spawn(move || {
            (0..200)
                .filter(|_| shop.members().join(NewMember::new("kim", None)).is_ok())
                .count()
        })
    };

    rebuilder.join().unwrap();
    let accepted = joiner.join().unwrap();

    shop.rebuild_read_models().unwrap();
    let kims = shop
        .members()
        .find_members()
        .into_iter()
        .filter(|m| m.name == "kim")
        .count();
    assert_eq!(accepted, 0);
    assert_eq!(kims, 1);
}

#[test]
fn rename_checks_uniqueness_and_updates_directory() {
    let shop = InMemoryShop::in_memory(3);
    let kim = shop.members().join(NewMember::new("kim", None)).unwrap();
    shop.members().join(NewMember::new("lee", None)).unwrap();

    assert!(matches!(
        shop.members().update(kim, "lee"),
        Err(ServiceError::Domain(DomainError::DuplicateMember))
    ));

    // Keeping the current name is not a duplicate of itself.
    shop.members().update(kim, "kim").unwrap();
    shop.members().update(kim, "park").unwrap();
    assert_eq!(shop.members().find_one(kim).unwrap().name, "park");
}

#[test]
fn updating_an_unknown_member_is_not_found() {
    let shop = InMemoryShop::in_memory(3);
    assert!(matches!(
        shop.members().update(MemberId::generate(), "ghost"),
        Err(ServiceError::NotFound(_))
    ));
}
