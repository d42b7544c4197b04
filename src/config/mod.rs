//! Cluster bootstrap configuration: raw environment options and the planner that resolves
//! them into a [`BootstrapPlan`].

pub mod error;
pub mod host;
pub mod options;
pub mod plan;

pub use error::ConfigError;
pub use host::{FixedHost, HostEnvironment, SystemHost};
pub use options::{ClusterOptions, DiscoveryOptions, Role, RuntimeOptions, StartupMethod};
pub use plan::{plan, BootstrapPlan, Discovery, Endpoint};
