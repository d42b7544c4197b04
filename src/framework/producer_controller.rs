//! # Producer Controller
//!
//! Sits between one producer and a [`ShardRegion`](crate::framework::ShardRegion) and decides
//! when the producer may send again.

use crate::framework::client::RegionClient;
use crate::framework::delivery::{Produced, RequestNext, SendNext};
use crate::framework::entity::ShardedEntity;
use crate::framework::error::FrameworkError;
use crate::framework::region::ConfirmationSink;
use crate::model::EntityId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Issues demand tokens to one producer and forwards what it sends to a region.
///
/// # Demand Rules
/// - At most one token is outstanding. A new one is issued only after the previous one
///   was spent.
/// - No token is issued while `window` envelopes are still unconfirmed by their entities.
/// - An envelope sent with anything but the outstanding token is a protocol violation and
///   is dropped.
pub struct ProducerController<E: ShardedEntity> {
    producer_id: String,
    region: RegionClient<E>,
    window: usize,
    produced_tx: mpsc::UnboundedSender<Produced<E::Command>>,
    produced: mpsc::UnboundedReceiver<Produced<E::Command>>,
    confirmations_tx: ConfirmationSink,
    confirmations: mpsc::UnboundedReceiver<Option<EntityId>>,
    next_token: u64,
    outstanding_token: Option<u64>,
    in_flight: usize,
}

impl<E: ShardedEntity> ProducerController<E> {
    pub fn new(producer_id: impl Into<String>, region: RegionClient<E>, window: usize) -> Self {
        let (produced_tx, produced) = mpsc::unbounded_channel();
        let (confirmations_tx, confirmations) = mpsc::unbounded_channel();
        Self {
            producer_id: producer_id.into(),
            region,
            window: window.max(1),
            produced_tx,
            produced,
            confirmations_tx,
            confirmations,
            next_token: 1,
            outstanding_token: None,
            in_flight: 0,
        }
    }

    /// Runs until cancelled or until the producer stops accepting capacity grants.
    pub async fn run(
        mut self,
        producer: mpsc::Sender<RequestNext<E::Command>>,
        cancel: CancellationToken,
    ) {
        info!(producer_id = %self.producer_id, window = self.window, "Producer controller started");

        if self.request_next(&producer).await.is_ok() {
            loop {
                let step = tokio::select! {
                    _ = cancel.cancelled() => break,
                    Some(produced) = self.produced.recv() => self.on_produced(produced, &producer).await,
                    Some(entity_id) = self.confirmations.recv() => self.on_released(entity_id, &producer).await,
                };
                if let Err(e) = step {
                    info!(producer_id = %self.producer_id, error = %e, "Producer gone");
                    break;
                }
            }
        }

        info!(producer_id = %self.producer_id, in_flight = self.in_flight, "Producer controller stopped");
    }

    async fn on_produced(
        &mut self,
        produced: Produced<E::Command>,
        producer: &mpsc::Sender<RequestNext<E::Command>>,
    ) -> Result<(), FrameworkError> {
        if self.outstanding_token != Some(produced.token) {
            error!(
                producer_id = %self.producer_id,
                token = produced.token,
                outstanding = ?self.outstanding_token,
                "Protocol violation: envelope sent without demand"
            );
            return Ok(());
        }
        self.outstanding_token = None;

        let entity_id = produced.envelope.entity_id.clone();
        match self
            .region
            .route(produced.envelope.into(), Some(self.confirmations_tx.clone()))
            .await
        {
            Ok(()) => {
                self.in_flight += 1;
                debug!(%entity_id, in_flight = self.in_flight, "Routed");
            }
            Err(e) => warn!(%entity_id, error = %e, "Route failed"),
        }
        self.request_next(producer).await
    }

    async fn on_released(
        &mut self,
        entity_id: Option<EntityId>,
        producer: &mpsc::Sender<RequestNext<E::Command>>,
    ) -> Result<(), FrameworkError> {
        self.in_flight = self.in_flight.saturating_sub(1);
        debug!(entity_id = ?entity_id, in_flight = self.in_flight, "Released");
        self.request_next(producer).await
    }

    async fn request_next(
        &mut self,
        producer: &mpsc::Sender<RequestNext<E::Command>>,
    ) -> Result<(), FrameworkError> {
        if self.outstanding_token.is_some() || self.in_flight >= self.window {
            return Ok(());
        }
        let token = self.next_token;
        self.next_token += 1;
        self.outstanding_token = Some(token);

        let request = RequestNext {
            send_next_to: SendNext::new(token, self.produced_tx.clone()),
        };
        producer
            .send(request)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::delivery::{ConsumerHandle, Delivery};
    use crate::framework::message::ShardingEnvelope;
    use crate::framework::region::RegionRequest;
    use async_trait::async_trait;

    #[derive(Debug, thiserror::Error)]
    #[error("never")]
    struct Never;

    struct Acker;

    #[async_trait]
    impl ShardedEntity for Acker {
        type Command = u32;
        type Snapshot = ();
        type Context = ();
        type Error = Never;

        fn create(_: EntityId, _: &()) -> Self {
            Acker
        }
        async fn on_start(&mut self, consumer: &ConsumerHandle) -> Result<(), Never> {
            consumer.start();
            Ok(())
        }
        async fn on_delivery(&mut self, delivery: Delivery<u32>, consumer: &ConsumerHandle) {
            delivery.confirm_to.confirm();
            consumer.request_next();
        }
        fn snapshot(&self) {}
    }

    fn controller(window: usize) -> (ProducerController<Acker>, mpsc::Receiver<RegionRequest<Acker>>) {
        let (sender, receiver) = mpsc::channel(16);
        (ProducerController::new("p-1", RegionClient::new(sender), window), receiver)
    }

    #[tokio::test]
    async fn test_no_new_demand_until_token_spent() {
        let (controller, _region) = controller(4);
        let (producer_tx, mut producer_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(controller.run(producer_tx, cancel.clone()));

        let first = producer_rx.recv().await.unwrap();
        assert_eq!(first.send_next_to.token(), 1);
        tokio::task::yield_now().await;
        assert!(producer_rx.try_recv().is_err());

        first
            .send_next_to
            .send(ShardingEnvelope::new("Yoda", 7))
            .unwrap();
        let second = producer_rx.recv().await.unwrap();
        assert_eq!(second.send_next_to.token(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_window_blocks_demand_until_release() {
        let (controller, mut region) = controller(1);
        let (producer_tx, mut producer_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(controller.run(producer_tx, cancel.clone()));

        let first = producer_rx.recv().await.unwrap();
        first.send_next_to.send(ShardingEnvelope::new("Han", 1)).unwrap();

        let confirm_to = match region.recv().await.unwrap() {
            RegionRequest::Route { confirm_to, .. } => confirm_to.unwrap(),
            _ => panic!("expected Route"),
        };
        tokio::task::yield_now().await;
        assert!(producer_rx.try_recv().is_err(), "window of 1 is full");

        confirm_to.send(Some(EntityId::from("Han"))).unwrap();
        let second = producer_rx.recv().await.unwrap();
        assert_eq!(second.send_next_to.token(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_with_stale_token_is_dropped() {
        let (controller, mut region) = controller(4);
        let forged = SendNext::new(99, controller.produced_tx.clone());
        let (producer_tx, mut producer_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(controller.run(producer_tx, cancel.clone()));

        let first = producer_rx.recv().await.unwrap();
        assert_eq!(first.send_next_to.token(), 1);

        forged.send(ShardingEnvelope::new("Darth Vader", 66)).unwrap();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(region.try_recv().is_err(), "nothing routed for token 99");
        assert!(producer_rx.try_recv().is_err(), "no demand issued for token 99");

        first.send_next_to.send(ShardingEnvelope::new("Leia", 1)).unwrap();
        match region.recv().await.unwrap() {
            RegionRequest::Route { confirm_to, .. } => assert!(confirm_to.is_some()),
            _ => panic!("expected Route"),
        }
        let second = producer_rx.recv().await.unwrap();
        assert_eq!(second.send_next_to.token(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_producer_is_gone() {
        let (controller, _region) = controller(4);
        let (producer_tx, producer_rx) = mpsc::channel(4);
        drop(producer_rx);

        // Returns on its own: the first grant cannot be delivered.
        controller.run(producer_tx, CancellationToken::new()).await;
    }
}
