//! # Demand & Delivery Handles
//!
//! Capabilities exchanged across the flow-control boundary.
//!
//! - Producer side: a [`SendNext`] is a demand token. It authorizes exactly one envelope
//!   and is consumed by [`SendNext::send`].
//! - Consumer side: every [`Delivery`] carries a [`ConfirmTo`] that must be confirmed once.
//!   The entity signals readiness for its next delivery through its [`ConsumerHandle`].

use crate::framework::error::FrameworkError;
use crate::framework::message::ShardingEnvelope;
use crate::model::EntityId;
use std::fmt::Debug;
use tokio::sync::mpsc;

// =============================================================================
// PRODUCER SIDE
// =============================================================================

/// An envelope produced against a specific demand token.
#[derive(Debug)]
pub(crate) struct Produced<C> {
    pub token: u64,
    pub envelope: ShardingEnvelope<C>,
}

/// A demand token: permission to send exactly one more envelope.
pub struct SendNext<C> {
    token: u64,
    controller: mpsc::UnboundedSender<Produced<C>>,
}

impl<C> SendNext<C> {
    pub(crate) fn new(token: u64, controller: mpsc::UnboundedSender<Produced<C>>) -> Self {
        Self { token, controller }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Sends one envelope, spending the token.
    ///
    /// Fails with [`FrameworkError::ChannelClosed`] when the controller behind the token is
    /// gone. The failure is not retried here.
    pub fn send(self, envelope: ShardingEnvelope<C>) -> Result<(), FrameworkError> {
        self.controller
            .send(Produced {
                token: self.token,
                envelope,
            })
            .map_err(|_| FrameworkError::ChannelClosed)
    }
}

impl<C> Debug for SendNext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendNext").field("token", &self.token).finish()
    }
}

/// Capacity grant handed to a producer.
#[derive(Debug)]
pub struct RequestNext<C> {
    pub send_next_to: SendNext<C>,
}

// =============================================================================
// CONSUMER SIDE
// =============================================================================

/// Signals an entity sends back to its region.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConsumerEvent {
    /// The entity can take one more delivery.
    Ready { entity_id: EntityId },
    /// A delivery was processed.
    Confirmed { entity_id: EntityId, seq_nr: u64 },
    /// A delivery was dropped without being confirmed.
    Unconfirmed { entity_id: EntityId, seq_nr: u64 },
}

/// Handle an entity uses to ask its region for more work.
#[derive(Debug, Clone)]
pub struct ConsumerHandle {
    entity_id: EntityId,
    events: mpsc::UnboundedSender<ConsumerEvent>,
}

impl ConsumerHandle {
    pub(crate) fn new(entity_id: EntityId, events: mpsc::UnboundedSender<ConsumerEvent>) -> Self {
        Self { entity_id, events }
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Registers the entity as ready for its first delivery.
    pub fn start(&self) {
        self.request_next();
    }

    /// Signals that the entity is ready for its next delivery.
    pub fn request_next(&self) {
        let _ = self.events.send(ConsumerEvent::Ready {
            entity_id: self.entity_id.clone(),
        });
    }
}

/// Acknowledgment target for a single delivery.
///
/// Dropping it without calling [`ConfirmTo::confirm`] reports the delivery as
/// unconfirmed, which the region treats as a protocol violation.
#[derive(Debug)]
pub struct ConfirmTo {
    entity_id: EntityId,
    seq_nr: u64,
    events: mpsc::UnboundedSender<ConsumerEvent>,
    confirmed: bool,
}

impl ConfirmTo {
    pub(crate) fn new(
        entity_id: EntityId,
        seq_nr: u64,
        events: mpsc::UnboundedSender<ConsumerEvent>,
    ) -> Self {
        Self {
            entity_id,
            seq_nr,
            events,
            confirmed: false,
        }
    }

    pub fn confirm(mut self) {
        self.confirmed = true;
        let _ = self.events.send(ConsumerEvent::Confirmed {
            entity_id: self.entity_id.clone(),
            seq_nr: self.seq_nr,
        });
    }
}

impl Drop for ConfirmTo {
    fn drop(&mut self) {
        if !self.confirmed {
            let _ = self.events.send(ConsumerEvent::Unconfirmed {
                entity_id: self.entity_id.clone(),
                seq_nr: self.seq_nr,
            });
        }
    }
}

/// One unit of work handed to an entity.
#[derive(Debug)]
pub struct Delivery<C> {
    pub seq_nr: u64,
    pub command: C,
    pub confirm_to: ConfirmTo,
}
