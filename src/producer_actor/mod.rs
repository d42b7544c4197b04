//! Producer-specific logic: the burst state machine and the task that drives it.

pub mod pools;
pub mod producer;

pub use producer::*;

use crate::framework::{FrameworkError, RequestNext};
use crate::model::CustomerCommand;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ProducerSettings {
    /// Delay before the first burst timer tick.
    pub burst_initial_delay: Duration,
    /// Period of the burst timer after the first tick.
    pub burst_interval: Duration,
    /// Capacity of the producer's inbox of capacity grants.
    pub buffer_size: usize,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            burst_initial_delay: Duration::from_secs(30),
            burst_interval: Duration::from_secs(300),
            buffer_size: 8,
        }
    }
}

/// A producer bound to its inbox, ready to be spawned.
pub struct ProducerActor<R: Rng> {
    producer_id: String,
    producer: Producer<R>,
    inbox: mpsc::Receiver<RequestNext<CustomerCommand>>,
    settings: ProducerSettings,
}

/// Creates a producer actor and the sender its controller grants capacity through.
pub fn new<R: Rng>(
    producer_id: impl Into<String>,
    rng: R,
    settings: ProducerSettings,
) -> (ProducerActor<R>, mpsc::Sender<RequestNext<CustomerCommand>>) {
    let (sender, inbox) = mpsc::channel(settings.buffer_size.max(1));
    let actor = ProducerActor {
        producer_id: producer_id.into(),
        producer: Producer::new(rng),
        inbox,
        settings,
    };
    (actor, sender)
}

impl<R: Rng> ProducerActor<R> {
    /// Runs until cancelled or until the controller drops its sender. The burst timer is
    /// owned by this loop and stops with it.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(producer_id = %self.producer_id, "Producer started");

        let period = self.settings.burst_interval.max(Duration::from_millis(1));
        let mut timer = tokio::time::interval_at(Instant::now() + self.settings.burst_initial_delay, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.inbox.recv() => match next {
                    Some(next) => self.producer.on_request_next(next.send_next_to),
                    None => break,
                },
                _ = timer.tick() => self.producer.on_burst_timer(),
            };
            match result {
                Ok(()) => {}
                Err(FrameworkError::ProtocolViolation(reason)) => {
                    error!(producer_id = %self.producer_id, %reason, "Protocol violation");
                }
                Err(e) => warn!(producer_id = %self.producer_id, error = %e, "Send failed"),
            }
        }

        info!(
            producer_id = %self.producer_id,
            state = ?self.producer.state(),
            burst_count = self.producer.burst_count(),
            "Producer stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockController;
    use rand::rngs::mock::StepRng;

    fn settings() -> ProducerSettings {
        ProducerSettings {
            burst_initial_delay: Duration::from_secs(30),
            burst_interval: Duration::from_secs(300),
            buffer_size: 4,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_burst_fires_after_initial_delay() {
        let (actor, inbox) = new("p-1", StepRng::new(0, 0), settings());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(actor.run(cancel.clone()));
        let mut capacity = MockController::new();

        inbox
            .send(RequestNext { send_next_to: capacity.grant() })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(capacity.drain().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(capacity.drain().len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_inbox_closes() {
        let (actor, inbox) = new("p-2", StepRng::new(0, 0), settings());
        drop(inbox);
        actor.run(CancellationToken::new()).await;
    }
}
