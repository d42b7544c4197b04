//! # Shard Key Extraction
//!
//! Maps an inbound [`RegionMessage`] to the entity it is addressed to and to the payload
//! that entity receives. Extraction is pure and total: unrecognized shapes yield `None`.

use crate::framework::message::RegionMessage;
use crate::model::{EntityId, ShardId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Number of shards used by [`HashCodeMessageExtractor::default`].
pub const DEFAULT_MAX_SHARDS: u32 = 10;

/// Decides which entity (and shard) a region message belongs to.
pub trait MessageExtractor<M>: Send + Sync {
    /// The entity a message is addressed to, or `None` when it is not routable by identity.
    fn entity_id(&self, message: &RegionMessage<M>) -> Option<EntityId>;

    /// The payload the entity receives. Envelopes are unwrapped to their bare command;
    /// every other shape is returned unchanged.
    fn entity_message(&self, message: RegionMessage<M>) -> RegionMessage<M>;

    /// The shard an entity id lives in.
    fn shard_id(&self, entity_id: &EntityId) -> ShardId;
}

/// Extractor that places entities into a fixed number of shards by hashing their id.
#[derive(Debug, Clone, Copy)]
pub struct HashCodeMessageExtractor {
    max_number_of_shards: u32,
}

impl HashCodeMessageExtractor {
    pub fn new(max_number_of_shards: u32) -> Self {
        Self {
            max_number_of_shards: max_number_of_shards.max(1),
        }
    }
}

impl Default for HashCodeMessageExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SHARDS)
    }
}

impl<M> MessageExtractor<M> for HashCodeMessageExtractor {
    fn entity_id(&self, message: &RegionMessage<M>) -> Option<EntityId> {
        match message {
            RegionMessage::StartEntity(start) => Some(start.entity_id.clone()),
            RegionMessage::Envelope(envelope) => Some(envelope.entity_id.clone()),
            RegionMessage::Command(_) => None,
        }
    }

    fn entity_message(&self, message: RegionMessage<M>) -> RegionMessage<M> {
        match message {
            RegionMessage::Envelope(envelope) => RegionMessage::Command(envelope.message),
            other => other,
        }
    }

    fn shard_id(&self, entity_id: &EntityId) -> ShardId {
        // DefaultHasher::new() uses fixed keys, so the mapping is stable for the process.
        let mut hasher = DefaultHasher::new();
        entity_id.as_str().hash(&mut hasher);
        ShardId((hasher.finish() % u64::from(self.max_number_of_shards)) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::message::{ShardingEnvelope, StartEntity};
    use crate::model::CustomerCommand;

    fn extractor() -> HashCodeMessageExtractor {
        HashCodeMessageExtractor::default()
    }

    #[test]
    fn test_envelope_yields_identity_and_payload() {
        let command = CustomerCommand::purchase("Lightsaber");
        let message = RegionMessage::from(ShardingEnvelope::new("Luke Skywalker", command.clone()));

        assert_eq!(
            extractor().entity_id(&message),
            Some(EntityId::from("Luke Skywalker"))
        );
        assert_eq!(
            extractor().entity_message(message),
            RegionMessage::Command(command)
        );
    }

    #[test]
    fn test_start_entity_is_routable_and_passed_through() {
        let message: RegionMessage<CustomerCommand> = StartEntity {
            entity_id: EntityId::from("Han Solo"),
        }
        .into();

        assert_eq!(extractor().entity_id(&message), Some(EntityId::from("Han Solo")));
        assert_eq!(extractor().entity_message(message.clone()), message);
    }

    #[test]
    fn test_bare_command_is_not_routable() {
        let message = RegionMessage::Command(CustomerCommand::Unknown);

        assert_eq!(extractor().entity_id(&message), None);
        assert_eq!(extractor().entity_message(message.clone()), message);
    }

    #[test]
    fn test_shard_id_is_stable_and_bounded() {
        let extractor = HashCodeMessageExtractor::new(4);
        let id = EntityId::from("Geralt Croft");
        let first = MessageExtractor::<CustomerCommand>::shard_id(&extractor, &id);
        let second = MessageExtractor::<CustomerCommand>::shard_id(&extractor, &id);

        assert_eq!(first, second);
        assert!(first.0 < 4);
    }
}
