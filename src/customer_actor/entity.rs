//! [`ShardedEntity`] implementation for [`Customer`].

use crate::customer_actor::load::LoadTask;
use crate::customer_actor::CustomerError;
use crate::framework::{ConsumerHandle, Delivery, ShardedEntity};
use crate::model::{CustomerCommand, EntityId};
use async_trait::async_trait;
use tracing::{info, warn};

/// Settings shared by every customer entity.
#[derive(Debug, Clone)]
pub struct CustomerSettings {
    /// Simulated CPU load per entity, in percent. `0` disables it.
    pub cpu_load_percent: u8,
}

impl Default for CustomerSettings {
    fn default() -> Self {
        Self { cpu_load_percent: 10 }
    }
}

/// One customer: an append-only purchase history, lost on passivation.
pub struct Customer {
    entity_id: EntityId,
    purchased_items: Vec<String>,
    cpu_load_percent: u8,
    load: Option<LoadTask>,
}

impl Customer {
    pub fn purchased_items(&self) -> &[String] {
        &self.purchased_items
    }
}

#[async_trait]
impl ShardedEntity for Customer {
    type Command = CustomerCommand;
    type Snapshot = Vec<String>;
    type Context = CustomerSettings;
    type Error = CustomerError;

    fn create(entity_id: EntityId, ctx: &CustomerSettings) -> Self {
        Self {
            entity_id,
            purchased_items: Vec::new(),
            cpu_load_percent: ctx.cpu_load_percent,
            load: None,
        }
    }

    async fn on_start(&mut self, consumer: &ConsumerHandle) -> Result<(), CustomerError> {
        consumer.start();
        if self.cpu_load_percent > 0 {
            self.load = Some(LoadTask::start(self.cpu_load_percent)?);
        }
        Ok(())
    }

    async fn on_delivery(&mut self, delivery: Delivery<CustomerCommand>, consumer: &ConsumerHandle) {
        let Delivery {
            seq_nr,
            command,
            confirm_to,
        } = delivery;

        match command {
            CustomerCommand::PurchaseItem { item_name } => {
                info!(entity_id = %self.entity_id, item = %item_name, "Purchased");
                self.purchased_items.push(item_name);
            }
            CustomerCommand::Unknown => {
                warn!(entity_id = %self.entity_id, seq_nr, "Unhandled command");
            }
        }

        confirm_to.confirm();
        consumer.request_next();
    }

    async fn on_stop(&mut self) {
        if let Some(load) = self.load.take() {
            load.stop().await;
        }
        info!(
            entity_id = %self.entity_id,
            purchases = self.purchased_items.len(),
            "Customer stopped"
        );
    }

    fn snapshot(&self) -> Vec<String> {
        self.purchased_items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockConsumer;

    fn customer(name: &str) -> Customer {
        Customer::create(EntityId::from(name), &CustomerSettings { cpu_load_percent: 0 })
    }

    #[tokio::test]
    async fn test_start_signals_ready_once() {
        let customer_id = "Luke Skywalker";
        let mut mock = MockConsumer::new(customer_id);
        let mut customer = customer(customer_id);

        customer.on_start(&mock.handle()).await.unwrap();

        assert_eq!(mock.signals().ready, 1);
        assert!(customer.load.is_none());
    }

    #[tokio::test]
    async fn test_purchases_follow_delivery_order() {
        let mut mock = MockConsumer::new("Geralt Croft");
        let mut customer = customer("Geralt Croft");
        let handle = mock.handle();
        let items = ["Candies", "Cigars", "Candies", "French fries"];

        for item in items {
            let delivery = mock.delivery(CustomerCommand::purchase(item));
            customer.on_delivery(delivery, &handle).await;
        }

        assert_eq!(customer.purchased_items(), items);
        assert_eq!(customer.snapshot(), items);
        let signals = mock.signals();
        assert_eq!(signals.confirmed, vec![1, 2, 3, 4]);
        assert_eq!(signals.ready, 4);
    }

    #[tokio::test]
    async fn test_unknown_command_is_still_confirmed() {
        let mut mock = MockConsumer::new("Sad Banana");
        let mut customer = customer("Sad Banana");

        let delivery = mock.delivery(CustomerCommand::Unknown);
        customer.on_delivery(delivery, &mock.handle()).await;

        let signals = mock.signals();
        assert_eq!(signals.confirmed.len(), 1);
        assert_eq!(signals.ready, 1);
        assert!(signals.unconfirmed.is_empty());
        assert!(customer.purchased_items().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_load_fails_start_after_signalling_ready() {
        let mut mock = MockConsumer::new("Max Payne");
        let mut customer =
            Customer::create(EntityId::from("Max Payne"), &CustomerSettings { cpu_load_percent: 150 });

        let result = customer.on_start(&mock.handle()).await;

        assert_eq!(result.err(), Some(CustomerError::InvalidLoadPercentage(150)));
        assert_eq!(mock.signals().ready, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_cancels_load() {
        let mock = MockConsumer::new("Duke Nukem");
        let mut customer =
            Customer::create(EntityId::from("Duke Nukem"), &CustomerSettings { cpu_load_percent: 5 });
        customer.on_start(&mock.handle()).await.unwrap();
        assert!(customer.load.is_some());

        tokio::time::timeout(std::time::Duration::from_secs(1), customer.on_stop())
            .await
            .unwrap();
        assert!(customer.load.is_none());
    }
}
