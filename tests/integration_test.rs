use shard_scaling::clients::CustomerClient;
use shard_scaling::config::{plan, ClusterOptions, FixedHost, Role};
use shard_scaling::customer_actor::CustomerSettings;
use shard_scaling::lifecycle::{ShardingSystem, SystemSettings};
use shard_scaling::producer_actor::ProducerSettings;
use rand::rngs::mock::StepRng;
use std::net::Ipv4Addr;
use std::time::Duration;

fn settings() -> SystemSettings {
    SystemSettings {
        customer: CustomerSettings { cpu_load_percent: 0 },
        producer: ProducerSettings {
            burst_initial_delay: Duration::from_secs(1),
            burst_interval: Duration::from_secs(300),
            ..ProducerSettings::default()
        },
        ..SystemSettings::default()
    }
}

fn start(role: Role) -> ShardingSystem {
    let host = FixedHost::new("node-1", Ipv4Addr::LOCALHOST);
    let plan = plan(role, &ClusterOptions::default(), &host).expect("static plan");
    ShardingSystem::start(&plan, settings())
}

async fn purchases_of(client: &CustomerClient, customer: &str, expected: usize) -> Vec<String> {
    let mut items = Vec::new();
    for _ in 0..200 {
        items = client
            .purchased_items(customer)
            .await
            .expect("region reachable")
            .unwrap_or_default();
        if items.len() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    items
}

/// Purchases sent through the client land in the customer's history, in order.
#[tokio::test]
async fn test_backend_records_purchases() {
    let system = start(Role::Backend);
    let client = system.customer_client.clone();

    for item in ["Yoghurt", "Dreamcatcher", "Yoghurt"] {
        client.purchase("Samus Aran", item).await.expect("purchase");
    }
    client.purchase("Zelda Zelda", "Fruits").await.expect("purchase");

    assert_eq!(
        purchases_of(&client, "Samus Aran", 3).await,
        vec!["Yoghurt", "Dreamcatcher", "Yoghurt"]
    );
    assert_eq!(purchases_of(&client, "Zelda Zelda", 1).await, vec!["Fruits"]);
    assert_eq!(client.stats().await.expect("stats").entity_count(), 2);

    drop(client);
    system.shutdown().await.expect("clean shutdown");
}

/// A frontend produces one full burst after member-up. With every draw at index 0, all 30
/// envelopes go to "Yoda Yoda" and buy "Yoghurt".
#[tokio::test(start_paused = true)]
async fn test_frontend_bursts_after_member_up() {
    let host = FixedHost::new("node-1", Ipv4Addr::LOCALHOST);
    let plan = plan(Role::Frontend, &ClusterOptions::default(), &host).expect("static plan");
    let system = ShardingSystem::start_with_rng(&plan, settings(), StepRng::new(0, 0));
    let client = system.customer_client.clone();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        client.stats().await.expect("stats").entity_count(),
        0,
        "nothing is produced before member-up"
    );

    system.membership.mark_up();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(purchases_of(&client, "Yoda Yoda", 30).await, vec!["Yoghurt"; 30]);
    assert_eq!(client.stats().await.expect("stats").entity_count(), 1);

    drop(client);
    system.shutdown().await.expect("clean shutdown");
}

/// A customer started without a purchase is running with an empty history.
#[tokio::test]
async fn test_started_customer_has_empty_history() {
    let system = start(Role::Backend);
    let client = system.customer_client.clone();

    assert_eq!(client.purchased_items("Bonnie MacFarlane").await.expect("snapshot"), None);
    client.start("Bonnie MacFarlane").await.expect("start");

    let mut items = None;
    for _ in 0..200 {
        items = client.purchased_items("Bonnie MacFarlane").await.expect("snapshot");
        if items.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(items, Some(Vec::new()));

    drop(client);
    system.shutdown().await.expect("clean shutdown");
}

/// Backends host customers but never produce.
#[tokio::test(start_paused = true)]
async fn test_backend_does_not_produce() {
    let system = start(Role::Backend);
    system.membership.mark_up();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        system.customer_client.stats().await.expect("stats").entity_count(),
        0
    );

    system.shutdown().await.expect("clean shutdown");
}

/// Shutdown works before member-up, with the producer still waiting.
#[tokio::test]
async fn test_shutdown_before_member_up() {
    let system = start(Role::Frontend);
    tokio::time::timeout(Duration::from_secs(1), system.shutdown())
        .await
        .expect("shutdown finishes")
        .expect("clean shutdown");
}
