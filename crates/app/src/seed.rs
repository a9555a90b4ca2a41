//! Demo data: two members, four books and one order per member.

use shop_events::EventBus;
use shop_infra::event_store::EventStore;
use shop_inventory::{ItemId, ItemKind};
use shop_members::{Address, MemberId};
use shop_orders::OrderId;

use crate::services::{JsonEnvelope, NewItem, NewMember, OrderLineRequest, ServiceError, Shop};

/// Ids of everything [`seed_demo_data`] created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoData {
    pub members: Vec<MemberId>,
    pub items: Vec<ItemId>,
    pub orders: Vec<OrderId>,
}

struct DemoOrder {
    member: &'static str,
    city: &'static str,
    street: &'static str,
    zipcode: &'static str,
    /// (name, author, price, stock, ordered count)
    books: [(&'static str, &'static str, u64, u32, u32); 2],
}

const DEMO_ORDERS: [DemoOrder; 2] = [
    DemoOrder {
        member: "userA",
        city: "Seoul",
        street: "1",
        zipcode: "1111",
        books: [
            ("JPA1 BOOK", "Kim Younghan", 10_000, 100, 1),
            ("JPA2 BOOK", "Kim Younghan", 20_000, 100, 2),
        ],
    },
    DemoOrder {
        member: "userB",
        city: "Busan",
        street: "2",
        zipcode: "2222",
        books: [
            ("SPRING1 BOOK", "Rod Johnson", 20_000, 200, 3),
            ("SPRING2 BOOK", "Rod Johnson", 40_000, 300, 4),
        ],
    },
];

pub fn seed_demo_data<S, B>(shop: &Shop<S, B>) -> Result<DemoData, ServiceError>
where
    S: EventStore,
    B: EventBus<JsonEnvelope>,
{
    let mut data = DemoData {
        members: Vec::new(),
        items: Vec::new(),
        orders: Vec::new(),
    };

    for demo in &DEMO_ORDERS {
        let address = Address::new(demo.city, demo.street, demo.zipcode)?;
        let member_id = shop.members().join(NewMember::new(demo.member, Some(address)))?;
        data.members.push(member_id);

        let mut lines = Vec::with_capacity(demo.books.len());
        for (name, author, price, stock, count) in demo.books {
            let item_id = shop.items().save_item(NewItem {
                name: name.to_string(),
                price,
                stock,
                kind: ItemKind::Book {
                    author: author.to_string(),
                    isbn: format!("{}-{}", demo.zipcode, data.items.len() + 1),
                },
            })?;
            data.items.push(item_id);
            lines.push(OrderLineRequest { item_id, count });
        }

        data.orders.push(shop.orders().order_lines(member_id, &lines)?);
    }

    tracing::info!(
        members = data.members.len(),
        items = data.items.len(),
        orders = data.orders.len(),
        "demo data seeded"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryShop, OrderSearch};
    use shop_core::DomainError;

    #[test]
    fn seeds_members_books_and_orders() {
        let shop = InMemoryShop::in_memory(3);

        let data = seed_demo_data(&shop).unwrap();

        assert_eq!(data.members.len(), 2);
        assert_eq!(data.items.len(), 4);
        assert_eq!(data.orders.len(), 2);

        let stocks: Vec<u32> = data
            .items
            .iter()
            .map(|id| shop.items().find_one(*id).unwrap().stock)
            .collect();
        assert_eq!(stocks, vec![99, 98, 197, 296]);

        let user_a_orders = shop.orders().find_orders(&OrderSearch {
            member_name: Some("userA".to_string()),
            status: None,
        });
        assert_eq!(user_a_orders.len(), 1);
        assert_eq!(user_a_orders[0].total_price, 50_000);
    }

    #[test]
    fn seeding_twice_hits_the_duplicate_member_guard() {
        let shop = InMemoryShop::in_memory(3);
        seed_demo_data(&shop).unwrap();

        match seed_demo_data(&shop) {
            Err(ServiceError::Domain(DomainError::DuplicateMember)) => {}
            other => panic!("Expected DuplicateMember, got {other:?}"),
        }
    }
}
