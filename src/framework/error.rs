//! # Framework Errors
//!
//! Errors raised by the sharding substrate itself. Entity-specific failures live in
//! each entity's own error type.

/// Errors that can occur within the sharding framework.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    /// The capacity channel the envelope was sent into is stale or closed.
    #[error("Capacity channel closed")]
    ChannelClosed,
    /// A demand or delivery contract was breached.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}
