//! Customer-specific entity logic.

pub mod entity;
pub mod error;
pub mod load;

pub use entity::*;
pub use error::*;

use crate::framework::{HashCodeMessageExtractor, RegionClient, RegionSettings, ShardRegion};

/// Creates the customer shard region and its client.
pub fn new(settings: RegionSettings, max_shards: u32) -> (ShardRegion<Customer>, RegionClient<Customer>) {
    ShardRegion::new(settings, HashCodeMessageExtractor::new(max_shards))
}
