use crate::framework::{FrameworkError, SendNext, ShardingEnvelope};
use crate::model::CustomerCommand;
use crate::producer_actor::pools::{self, ITEMS};
use rand::Rng;
use tracing::{debug, info};

/// Grants consumed per burst. The grant that reaches this count ends the burst instead of
/// producing.
pub const BURST_SIZE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    /// No capacity granted yet.
    Idle,
    /// Holding capacity, waiting for the burst timer.
    Active,
    /// Producing one envelope per grant.
    Bursting,
}

/// Flow-controlled producer of purchase envelopes.
///
/// Driven by two events: [`on_request_next`](Self::on_request_next) when the consuming
/// side grants capacity and [`on_burst_timer`](Self::on_burst_timer) when the periodic
/// timer fires. Every envelope is sent with the most recently granted [`SendNext`], which
/// is spent by the send.
pub struct Producer<R: Rng> {
    rng: R,
    state: ProducerState,
    send_next: Option<SendNext<CustomerCommand>>,
    burst_count: u32,
}

impl<R: Rng> Producer<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            state: ProducerState::Idle,
            send_next: None,
            burst_count: 0,
        }
    }

    pub fn state(&self) -> ProducerState {
        self.state
    }

    pub fn burst_count(&self) -> u32 {
        self.burst_count
    }

    /// Records fresh capacity. While bursting, also produces with it.
    pub fn on_request_next(&mut self, send_next: SendNext<CustomerCommand>) -> Result<(), FrameworkError> {
        self.send_next = Some(send_next);
        match self.state {
            ProducerState::Idle => {
                info!("Activating");
                self.state = ProducerState::Active;
                Ok(())
            }
            ProducerState::Active => Ok(()),
            ProducerState::Bursting => self.send(),
        }
    }

    /// Starts a burst when active. Ignored otherwise.
    pub fn on_burst_timer(&mut self) -> Result<(), FrameworkError> {
        match self.state {
            ProducerState::Active => {
                info!("Bursting");
                self.state = ProducerState::Bursting;
                self.send()
            }
            ProducerState::Idle | ProducerState::Bursting => {
                debug!(state = ?self.state, "Burst timer ignored");
                Ok(())
            }
        }
    }

    fn send(&mut self) -> Result<(), FrameworkError> {
        if self.burst_count >= BURST_SIZE {
            self.burst_count = 0;
            self.state = ProducerState::Active;
            info!("Activating");
            return Ok(());
        }

        let send_next = self.send_next.take().ok_or_else(|| {
            FrameworkError::ProtocolViolation("producer sent without capacity".to_string())
        })?;
        let customer = pools::customer_name(&mut self.rng);
        let item = pools::pick(&mut self.rng, &ITEMS);
        info!(burst_count = self.burst_count, item, customer = %customer, "Sending");

        send_next.send(ShardingEnvelope::new(customer, CustomerCommand::purchase(item)))?;
        self.burst_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockController;
    use crate::model::EntityId;
    use rand::rngs::mock::StepRng;

    fn producer() -> Producer<StepRng> {
        Producer::new(StepRng::new(0, 0))
    }

    #[test]
    fn test_grant_then_timer_starts_burst() {
        let mut producer = producer();
        let mut capacity = MockController::new();

        producer.on_request_next(capacity.grant()).unwrap();
        assert_eq!(producer.state(), ProducerState::Active);
        assert!(capacity.drain().is_empty());

        producer.on_burst_timer().unwrap();
        let sent = capacity.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].entity_id, EntityId::from("Yoda Yoda"));
        assert_eq!(sent[0].message, CustomerCommand::purchase("Yoghurt"));
        assert_eq!(producer.state(), ProducerState::Bursting);
        assert_eq!(producer.burst_count(), 1);
    }

    #[test]
    fn test_thirtieth_grant_ends_burst_without_sending() {
        let mut producer = producer();
        let mut capacity = MockController::new();
        producer.on_request_next(capacity.grant()).unwrap();
        producer.on_burst_timer().unwrap();
        capacity.drain();

        for _ in 0..30 {
            producer.on_request_next(capacity.grant()).unwrap();
        }

        assert_eq!(capacity.drain().len(), 29);
        assert_eq!(producer.state(), ProducerState::Active);
        assert_eq!(producer.burst_count(), 0);
    }

    #[test]
    fn test_timer_in_idle_is_ignored() {
        let mut producer = producer();
        producer.on_burst_timer().unwrap();
        producer.on_burst_timer().unwrap();
        assert_eq!(producer.state(), ProducerState::Idle);
        assert_eq!(producer.burst_count(), 0);
    }

    #[test]
    fn test_timer_while_bursting_is_ignored() {
        let mut producer = producer();
        let mut capacity = MockController::new();
        producer.on_request_next(capacity.grant()).unwrap();
        producer.on_burst_timer().unwrap();

        producer.on_burst_timer().unwrap();

        assert_eq!(capacity.drain().len(), 1);
        assert_eq!(producer.burst_count(), 1);
    }

    #[test]
    fn test_at_most_one_envelope_per_grant() {
        let mut producer = producer();
        let mut capacity = MockController::new();
        producer.on_request_next(capacity.grant()).unwrap();
        producer.on_burst_timer().unwrap();

        for _ in 0..10 {
            producer.on_request_next(capacity.grant()).unwrap();
        }

        let sent = capacity.drain_with_tokens();
        let mut tokens: Vec<u64> = sent.iter().map(|(token, _)| *token).collect();
        tokens.dedup();
        assert_eq!(tokens.len(), sent.len());
    }

    #[test]
    fn test_stale_capacity_is_surfaced() {
        let mut producer = producer();
        let mut capacity = MockController::new();
        producer.on_request_next(capacity.grant()).unwrap();
        capacity.close();

        assert_eq!(producer.on_burst_timer(), Err(FrameworkError::ChannelClosed));
        assert_eq!(producer.burst_count(), 0);
    }

    #[test]
    fn test_burst_without_fresh_capacity_is_a_protocol_violation() {
        let mut producer = producer();
        let mut capacity = MockController::new();
        producer.on_request_next(capacity.grant()).unwrap();
        producer.on_burst_timer().unwrap();

        // Complete the burst with grants, then spend the retained grant on a new burst.
        for _ in 0..30 {
            producer.on_request_next(capacity.grant()).unwrap();
        }
        producer.on_burst_timer().unwrap();
        assert_eq!(producer.burst_count(), 1);

        producer.state = ProducerState::Active;
        assert!(matches!(
            producer.on_burst_timer(),
            Err(FrameworkError::ProtocolViolation(_))
        ));
    }
}
