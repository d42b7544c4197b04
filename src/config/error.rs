//! Error types for cluster bootstrap configuration.

use thiserror::Error;

/// Configuration errors are fatal: the process does not proceed to cluster formation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// `CLUSTER__STARTUPMETHOD` names no known strategy.
    #[error("Unknown startup method (CLUSTER__STARTUPMETHOD): {0}")]
    UnknownStartupMethod(String),

    #[error(
        "Cluster startup is set to configuration discovery but discovery endpoints \
         (CLUSTER__DISCOVERY__CONFIGENDPOINTS) is not set"
    )]
    MissingDiscoveryEndpoints,

    /// The local host name or address could not be resolved.
    #[error("Host resolution failed: {0}")]
    HostResolution(String),
}
