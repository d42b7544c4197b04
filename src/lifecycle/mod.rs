//! Process lifecycle: starting and stopping the actors, cluster membership and tracing.

pub mod membership;
pub mod sharding_system;
pub mod tracing;

pub use membership::*;
pub use sharding_system::*;
pub use self::tracing::setup_tracing;
