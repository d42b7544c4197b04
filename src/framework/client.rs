//! Typed handle to a running [`ShardRegion`](crate::framework::ShardRegion).

use crate::framework::entity::ShardedEntity;
use crate::framework::error::FrameworkError;
use crate::framework::message::RegionMessage;
use crate::framework::region::{ConfirmationSink, RegionRequest, RegionStats};
use crate::model::EntityId;
use tokio::sync::{mpsc, oneshot};

/// A type-safe client for talking to a [`ShardRegion`](crate::framework::ShardRegion).
///
/// Holds only a sender, so cloning is cheap. The region shuts down once every clone is
/// dropped.
pub struct RegionClient<E: ShardedEntity> {
    sender: mpsc::Sender<RegionRequest<E>>,
}

impl<E: ShardedEntity> Clone for RegionClient<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: ShardedEntity> RegionClient<E> {
    pub fn new(sender: mpsc::Sender<RegionRequest<E>>) -> Self {
        Self { sender }
    }

    /// Hands a message to the region for routing. Delivery is asynchronous.
    pub async fn tell(
        &self,
        message: impl Into<RegionMessage<E::Command>>,
    ) -> Result<(), FrameworkError> {
        self.route(message.into(), None).await
    }

    pub(crate) async fn route(
        &self,
        message: RegionMessage<E::Command>,
        confirm_to: Option<ConfirmationSink>,
    ) -> Result<(), FrameworkError> {
        self.sender
            .send(RegionRequest::Route {
                message,
                confirm_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }

    /// Fetches the state of a running entity, or `None` if it is not running.
    pub async fn snapshot(&self, entity_id: EntityId) -> Result<Option<E::Snapshot>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(RegionRequest::Snapshot {
                entity_id,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn stats(&self) -> Result<RegionStats, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(RegionRequest::Stats { respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}
