//! # Region Messages
//!
//! The shapes a [`ShardRegion`](crate::framework::ShardRegion) accepts. Only
//! [`RegionMessage::Envelope`] and [`RegionMessage::StartEntity`] carry an entity id;
//! everything else is opaque to routing.

use crate::framework::error::FrameworkError;
use crate::model::EntityId;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Pairs an entity id with a command for transport across the routing boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingEnvelope<M> {
    pub entity_id: EntityId,
    pub message: M,
}

impl<M> ShardingEnvelope<M> {
    pub fn new(entity_id: impl Into<EntityId>, message: M) -> Self {
        Self {
            entity_id: entity_id.into(),
            message,
        }
    }
}

/// Control message asking the region to start an entity without delivering work to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StartEntity {
    pub entity_id: EntityId,
}

/// Anything that can be handed to a shard region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionMessage<M> {
    /// An addressed command.
    Envelope(ShardingEnvelope<M>),
    /// Start a specific entity.
    StartEntity(StartEntity),
    /// A bare command with no addressing.
    Command(M),
}

impl<M> From<ShardingEnvelope<M>> for RegionMessage<M> {
    fn from(envelope: ShardingEnvelope<M>) -> Self {
        RegionMessage::Envelope(envelope)
    }
}

impl<M> From<StartEntity> for RegionMessage<M> {
    fn from(start: StartEntity) -> Self {
        RegionMessage::StartEntity(start)
    }
}
