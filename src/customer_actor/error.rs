//! Error types for the Customer entity.

use crate::framework::FrameworkError;
use thiserror::Error;

/// Errors that can occur for customer entities and their clients.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CustomerError {
    /// The simulated CPU load must be a percentage between 1 and 100.
    #[error("CPU load percentage must be between 1 and 100, got {0}")]
    InvalidLoadPercentage(u8),

    /// An error occurred while communicating with the region.
    #[error("Actor communication error: {0}")]
    Framework(#[from] FrameworkError),
}
