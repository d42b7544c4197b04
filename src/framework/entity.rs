//! # ShardedEntity Trait
//!
//! The contract an entity type implements to be hosted by a
//! [`ShardRegion`](crate::framework::ShardRegion). The region creates one instance per
//! entity id on first use and drives it from a dedicated task, one message at a time, so
//! implementations keep plain owned state.
//!
//! # Delivery Obligations
//! For every [`Delivery`] the entity must call [`ConfirmTo::confirm`] exactly once and then
//! [`ConsumerHandle::request_next`]. The region never hands an entity a second delivery
//! before both have happened.
//!
//! [`ConfirmTo::confirm`]: crate::framework::ConfirmTo::confirm

use crate::framework::delivery::{ConsumerHandle, Delivery};
use crate::model::EntityId;
use async_trait::async_trait;
use std::fmt::Debug;

#[async_trait]
pub trait ShardedEntity: Send + 'static {
    /// The command type delivered to this entity.
    type Command: Send + Debug + 'static;

    /// A read-only view of the entity's state.
    type Snapshot: Send + Debug + Clone + 'static;

    /// Settings and dependencies shared by every instance, cloned into each entity.
    /// Use `()` if nothing is needed.
    type Context: Send + Sync + Clone + 'static;

    /// The error type for lifecycle hooks.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct a fresh instance for `entity_id`.
    fn create(entity_id: EntityId, ctx: &Self::Context) -> Self;

    // --- Lifecycle Hooks (Async) ---

    /// Called once before any delivery. Implementations must call
    /// [`ConsumerHandle::start`] here to receive work.
    async fn on_start(&mut self, consumer: &ConsumerHandle) -> Result<(), Self::Error>;

    /// Handle one delivery.
    async fn on_delivery(&mut self, delivery: Delivery<Self::Command>, consumer: &ConsumerHandle);

    /// Called once when the entity is passivated or the region shuts down.
    async fn on_stop(&mut self) {}

    fn snapshot(&self) -> Self::Snapshot;
}
