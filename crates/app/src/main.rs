use std::thread;

use anyhow::Context;

use shop_app::seed::seed_demo_data;
use shop_app::services::OrderSearch;
use shop_app::{AppConfig, InMemoryShop};
use shop_events::EventBus;
use shop_orders::OrderStatus;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    shop_observability::init(&config.log_filter, config.log_format);

    let shop = InMemoryShop::in_memory(config.max_conflict_retries);

    // Log every committed event; the subscriber ends when the bus is dropped.
    let subscription = shop.bus().subscribe();
    let listener = thread::spawn(move || {
        while let Ok(envelope) = subscription.recv() {
            tracing::debug!(
                aggregate_type = envelope.aggregate_type(),
                aggregate_id = %envelope.aggregate_id(),
                sequence = envelope.sequence_number(),
                event_type = envelope.event_type(),
                "event published"
            );
        }
    });

    if config.seed_demo_data {
        seed_demo_data(&shop).context("failed to seed demo data")?;
    }

    let orders = shop.orders().find_orders(&OrderSearch::default());
    let ordered = orders.iter().filter(|o| o.status == OrderStatus::Ordered).count();
    tracing::info!(
        members = shop.members().find_members().len(),
        items = shop.items().find_items().len(),
        orders = orders.len(),
        ordered,
        "storefront ready"
    );

    for item in shop.items().find_items() {
        tracing::info!(item = %item.name, price = item.price, stock = item.stock, "catalogue");
    }

    drop(shop);
    listener
        .join()
        .map_err(|_| anyhow::anyhow!("event listener thread panicked"))?;
    Ok(())
}
