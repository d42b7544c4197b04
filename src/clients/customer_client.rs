use crate::customer_actor::{Customer, CustomerError};
use crate::framework::{RegionClient, RegionStats, ShardingEnvelope, StartEntity};
use crate::model::{CustomerCommand, EntityId};
use tracing::{debug, instrument};

/// Client for the customer shard region.
#[derive(Clone)]
pub struct CustomerClient {
    inner: RegionClient<Customer>,
}

impl CustomerClient {
    pub fn new(inner: RegionClient<Customer>) -> Self {
        Self { inner }
    }

    /// Sends a purchase to `customer`. Returns once the region accepted it.
    #[instrument(skip(self))]
    pub async fn purchase(&self, customer: &str, item: &str) -> Result<(), CustomerError> {
        debug!("Sending request");
        let envelope = ShardingEnvelope::new(customer, CustomerCommand::purchase(item));
        self.inner.tell(envelope).await?;
        Ok(())
    }

    /// Starts `customer` without delivering anything to it.
    #[instrument(skip(self))]
    pub async fn start(&self, customer: &str) -> Result<(), CustomerError> {
        let start = StartEntity {
            entity_id: EntityId::from(customer),
        };
        self.inner.tell(start).await?;
        Ok(())
    }

    /// The purchase history of a running customer, or `None` if it is not running.
    #[instrument(skip(self))]
    pub async fn purchased_items(&self, customer: &str) -> Result<Option<Vec<String>>, CustomerError> {
        debug!("Sending request");
        Ok(self.inner.snapshot(EntityId::from(customer)).await?)
    }

    pub async fn stats(&self) -> Result<RegionStats, CustomerError> {
        Ok(self.inner.stats().await?)
    }
}
