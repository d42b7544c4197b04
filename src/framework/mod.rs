//! In-process sharding substrate.
//!
//! Hosts many small stateful entities behind one region, routes messages to them by entity
//! id, and paces a single producer with demand-driven, at-least-once delivery.
//!
//! # Main Components
//!
//! - [`ShardedEntity`] - Trait that entity types implement to be hosted by a region
//! - [`ShardRegion`] - Owns the entities, spawns them lazily, passivates idle ones
//! - [`RegionClient`] - Type-safe handle for routing messages and querying a region
//! - [`HashCodeMessageExtractor`] - Maps envelopes to entity ids and shard ids
//! - [`ProducerController`] - Issues demand to a producer and forwards what it sends
//! - [`FrameworkError`] - Common error types
//!
//! # Testing
//!
//! See the [`mock`] module for mocks that drive producers and entities without a region.

pub mod client;
pub mod delivery;
pub mod entity;
pub mod error;
pub mod extractor;
pub mod message;
pub mod mock;
pub mod producer_controller;
pub mod region;

pub use client::RegionClient;
pub use delivery::{ConfirmTo, ConsumerHandle, Delivery, RequestNext, SendNext};
pub use entity::ShardedEntity;
pub use error::FrameworkError;
pub use extractor::{HashCodeMessageExtractor, MessageExtractor, DEFAULT_MAX_SHARDS};
pub use message::{RegionMessage, Response, ShardingEnvelope, StartEntity};
pub use producer_controller::ProducerController;
pub use region::{ConfirmationSink, RegionRequest, RegionSettings, RegionStats, ShardRegion};
