//! # Mock Framework
//!
//! Mocks for testing producers and entities without spawning a region or a controller.
//!
//! - [`MockController`] plays the producer controller: it grants demand tokens and records
//!   every envelope sent with them.
//! - [`MockConsumer`] plays the region for a single entity: it builds deliveries and
//!   records the confirmations and readiness signals the entity sends back.
//!
//! # Example
//! ```ignore
//! let mut capacity = MockController::<CustomerCommand>::new();
//! producer.on_request_next(capacity.grant())?;
//! producer.on_burst_timer()?;
//! assert_eq!(capacity.drain().len(), 1);
//! ```

use crate::framework::delivery::{
    ConfirmTo, ConsumerEvent, ConsumerHandle, Delivery, Produced, SendNext,
};
use crate::framework::message::ShardingEnvelope;
use crate::model::EntityId;
use tokio::sync::mpsc;

// =============================================================================
// PRODUCER SIDE
// =============================================================================

/// Grants demand tokens and captures what is sent with them.
pub struct MockController<C> {
    sender: mpsc::UnboundedSender<Produced<C>>,
    receiver: mpsc::UnboundedReceiver<Produced<C>>,
    next_token: u64,
}

impl<C> MockController<C> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            next_token: 1,
        }
    }

    /// Issues a fresh demand token.
    pub fn grant(&mut self) -> SendNext<C> {
        let token = self.next_token;
        self.next_token += 1;
        SendNext::new(token, self.sender.clone())
    }

    /// Returns every envelope sent so far, in send order, with the token it was sent on.
    pub fn drain_with_tokens(&mut self) -> Vec<(u64, ShardingEnvelope<C>)> {
        let mut sent = Vec::new();
        while let Ok(produced) = self.receiver.try_recv() {
            sent.push((produced.token, produced.envelope));
        }
        sent
    }

    /// Returns every envelope sent so far, in send order.
    pub fn drain(&mut self) -> Vec<ShardingEnvelope<C>> {
        self.drain_with_tokens()
            .into_iter()
            .map(|(_, envelope)| envelope)
            .collect()
    }

    /// Closes the channel so every outstanding token becomes stale.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl<C> Default for MockController<C> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// CONSUMER SIDE
// =============================================================================

/// What an entity signalled back since the last check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerSignals {
    /// Number of readiness signals (`start` and `request_next`).
    pub ready: usize,
    /// Sequence numbers confirmed, in order.
    pub confirmed: Vec<u64>,
    /// Sequence numbers dropped without confirmation.
    pub unconfirmed: Vec<u64>,
}

/// Stands in for the region on the consumer side of one entity.
pub struct MockConsumer {
    entity_id: EntityId,
    sender: mpsc::UnboundedSender<ConsumerEvent>,
    receiver: mpsc::UnboundedReceiver<ConsumerEvent>,
    next_seq_nr: u64,
}

impl MockConsumer {
    pub fn new(entity_id: impl Into<EntityId>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            entity_id: entity_id.into(),
            sender,
            receiver,
            next_seq_nr: 1,
        }
    }

    /// The handle to pass into the entity's hooks.
    pub fn handle(&self) -> ConsumerHandle {
        ConsumerHandle::new(self.entity_id.clone(), self.sender.clone())
    }

    /// Builds the next delivery for this entity.
    pub fn delivery<C>(&mut self, command: C) -> Delivery<C> {
        let seq_nr = self.next_seq_nr;
        self.next_seq_nr += 1;
        Delivery {
            seq_nr,
            command,
            confirm_to: ConfirmTo::new(self.entity_id.clone(), seq_nr, self.sender.clone()),
        }
    }

    /// Collects the signals received since the last call.
    pub fn signals(&mut self) -> ConsumerSignals {
        let mut signals = ConsumerSignals::default();
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                ConsumerEvent::Ready { .. } => signals.ready += 1,
                ConsumerEvent::Confirmed { seq_nr, .. } => signals.confirmed.push(seq_nr),
                ConsumerEvent::Unconfirmed { seq_nr, .. } => signals.unconfirmed.push(seq_nr),
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_envelopes_are_captured_with_their_token() {
        let mut mock = MockController::<u32>::new();
        let first = mock.grant();
        let second = mock.grant();

        second.send(ShardingEnvelope::new("Alf", 2)).unwrap();
        first.send(ShardingEnvelope::new("Sad Banana", 1)).unwrap();

        let sent = mock.drain_with_tokens();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, 2);
        assert_eq!(sent[1].1.entity_id, EntityId::from("Sad Banana"));
    }

    #[test]
    fn test_stale_token_reports_closed_channel() {
        let mut mock = MockController::<u32>::new();
        let token = mock.grant();
        mock.close();

        assert!(token.send(ShardingEnvelope::new("Noid", 0)).is_err());
    }

    #[test]
    fn test_dropped_delivery_is_reported_unconfirmed() {
        let mut mock = MockConsumer::new("Cloud Strife");
        let confirmed = mock.delivery("a");
        let dropped = mock.delivery("b");

        confirmed.confirm_to.confirm();
        drop(dropped);

        let signals = mock.signals();
        assert_eq!(signals.confirmed, vec![1]);
        assert_eq!(signals.unconfirmed, vec![2]);
        assert_eq!(signals.ready, 0);
    }
}
