//! Wires the customer region, and on frontends the producer, for one process.

use crate::clients::CustomerClient;
use crate::config::{BootstrapPlan, Role};
use crate::customer_actor::{self, Customer, CustomerSettings};
use crate::framework::{ProducerController, RegionClient, RegionSettings, DEFAULT_MAX_SHARDS};
use crate::lifecycle::ClusterMembership;
use crate::producer_actor::{self, ProducerSettings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Settings for every actor a [`ShardingSystem`] starts.
#[derive(Debug, Clone)]
pub struct SystemSettings {
    pub region: RegionSettings,
    pub customer: CustomerSettings,
    pub producer: ProducerSettings,
    pub max_shards: u32,
    /// Unconfirmed envelopes allowed per producer.
    pub producer_window: usize,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            region: RegionSettings::default(),
            customer: CustomerSettings::default(),
            producer: ProducerSettings::default(),
            max_shards: DEFAULT_MAX_SHARDS,
            producer_window: 16,
        }
    }
}

/// Producer id for the node at `address`.
pub fn producer_id(address: &str) -> String {
    let mut hasher = DefaultHasher::new();
    address.hash(&mut hasher);
    format!("ProducerId1{}", hasher.finish())
}

/// The runtime orchestrator for one process.
///
/// `ShardingSystem` is responsible for:
/// - **Hosting**: every process runs the customer shard region.
/// - **Producing**: frontends also wire a producer to the region, once this node is up.
/// - **Shutdown**: stopping the producer first, then the region and its entities.
///
/// # Example
///
/// ```ignore
/// let system = ShardingSystem::start(&plan, SystemSettings::default());
/// system.membership.mark_up();
///
/// system.customer_client.purchase("Han Solo", "Candies").await?;
///
/// system.shutdown().await?;
/// ```
pub struct ShardingSystem {
    /// Client for the customer shard region.
    pub customer_client: CustomerClient,

    /// This node's membership. Marking it up starts the producer on frontends.
    pub membership: ClusterMembership,

    cancel: CancellationToken,
    producer: Option<JoinHandle<()>>,
    region: JoinHandle<()>,
}

impl ShardingSystem {
    /// Spawns the actors for `plan.role`. Must be called inside a Tokio runtime.
    pub fn start(plan: &BootstrapPlan, settings: SystemSettings) -> Self {
        Self::start_with_rng(plan, settings, StdRng::from_entropy())
    }

    /// Like [`start`](Self::start), with the producer drawing from `rng`.
    pub fn start_with_rng<R>(plan: &BootstrapPlan, settings: SystemSettings, rng: R) -> Self
    where
        R: Rng + Send + 'static,
    {
        let (region, region_client) = customer_actor::new(settings.region, settings.max_shards);
        let region = tokio::spawn(region.run(settings.customer));

        let membership = ClusterMembership::new();
        let cancel = CancellationToken::new();

        let producer = match plan.role {
            Role::Frontend => {
                let producer_id = producer_id(&plan.advertised_address());
                Some(tokio::spawn(run_producer_when_up(
                    producer_id,
                    rng,
                    region_client.clone(),
                    membership.clone(),
                    settings.producer,
                    settings.producer_window,
                    cancel.clone(),
                )))
            }
            Role::Backend => None,
        };

        info!(role = %plan.role, address = %plan.advertised_address(), "Sharding system started");
        Self {
            customer_client: CustomerClient::new(region_client),
            membership,
            cancel,
            producer,
            region,
        }
    }

    /// Gracefully shuts down the producer, then the region.
    ///
    /// # Shutdown Process
    ///
    /// Cancelling stops the producer loop and its burst timer, and the controller drops its
    /// region client with it. Dropping the last client then closes the region's channel and
    /// the region stops every entity before exiting.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if every task shut down cleanly
    /// - `Err(String)` if any task panicked
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        self.cancel.cancel();
        if let Some(producer) = self.producer {
            if let Err(e) = producer.await {
                error!("Producer task failed: {:?}", e);
                return Err(format!("Producer task failed: {:?}", e));
            }
        }

        drop(self.customer_client);
        if let Err(e) = self.region.await {
            error!("Region task failed: {:?}", e);
            return Err(format!("Region task failed: {:?}", e));
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

/// Waits for member-up, then runs a producer and its controller until cancelled.
async fn run_producer_when_up<R: Rng + Send + 'static>(
    producer_id: String,
    rng: R,
    region: RegionClient<Customer>,
    membership: ClusterMembership,
    settings: ProducerSettings,
    window: usize,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = membership.wait_until_up() => {}
    }
    info!(%producer_id, "Member up, starting producer");

    let (producer, capacity) = producer_actor::new(producer_id.clone(), rng, settings);
    let controller = ProducerController::new(producer_id, region, window);

    let producer = tokio::spawn(producer.run(cancel.clone()));
    let controller = tokio::spawn(controller.run(capacity, cancel));

    for (name, handle) in [("producer", producer), ("producer controller", controller)] {
        if let Err(e) = handle.await {
            error!(task = name, "Task failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_id_is_stable_per_address() {
        let a = producer_id("10.0.0.1:5213");
        assert!(a.starts_with("ProducerId1"));
        assert_eq!(a, producer_id("10.0.0.1:5213"));
        assert_ne!(a, producer_id("10.0.0.2:5213"));
    }
}
