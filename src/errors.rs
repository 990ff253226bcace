// Copyright (c) 2025 - Hotswap Core Contributors
//! Error types for the hot-swap core
//!
//! The taxonomy distinguishes four kinds of failure:
//!
//! 1. **Transient infrastructure errors** ([`HotswapError::Storage`],
//!    [`HotswapError::NatsConnection`], [`HotswapError::NatsPublish`]) -
//!    retried by the caller, never silently dropped.
//! 2. **Validation-domain outcomes** (incompatible bytecode, unreadable
//!    files) - these are *not* errors at all; they are terminal domain
//!    events (`BytecodeRejected`, `ClassRedefinitionFailed`) recorded in the
//!    permanent audit trail.
//! 3. **Contract errors** ([`HotswapError::MissingCapability`],
//!    [`HotswapError::Configuration`]) - fail fast and loudly, signaling
//!    misconfiguration rather than a recoverable runtime condition.
//! 4. **Concurrency conflicts** ([`HotswapError::Concurrency`]) -
//!    recoverable; the caller re-reads the stream head and retries.

use thiserror::Error;

/// Errors that can occur in hot-swap core operations
#[derive(Debug, Error)]
pub enum HotswapError {
    /// Optimistic concurrency conflict on a single event stream
    #[error(
        "concurrency conflict on stream {aggregate_type}/{aggregate_id}: \
         expected version {expected}, current version is {current}"
    )]
    Concurrency {
        aggregate_type: String,
        aggregate_id: String,
        expected: u64,
        current: u64,
    },

    /// Event store I/O error
    #[error("event store error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// No adapter registered for a required capability
    #[error("no capability registered for {0}")]
    MissingCapability(&'static str),

    /// NATS connection error
    #[error("NATS connection error: {0}")]
    NatsConnection(String),

    /// NATS publish error
    #[error("NATS publish error: {0}")]
    NatsPublish(String),

    /// NATS subscribe error
    #[error("NATS subscribe error: {0}")]
    NatsSubscribe(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bug-report replay error
    #[error("replay error: {0}")]
    Replay(String),
}

/// Result type for hot-swap core operations
pub type HotswapResult<T> = Result<T, HotswapError>;

impl From<serde_json::Error> for HotswapError {
    fn from(err: serde_json::Error) -> Self {
        HotswapError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for HotswapError {
    fn from(err: std::io::Error) -> Self {
        HotswapError::Storage(err.to_string())
    }
}
