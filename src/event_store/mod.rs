// Copyright (c) 2025 - Hotswap Core Contributors
//! Event Store Abstraction
//!
//! Append-only, per-stream persistence with server-assigned versioning.
//!
//! # Architecture
//!
//! ```text
//! Pipeline → EventDraft → EventStore → VersionedEvent
//!                             ↓
//!                     chronological + type indexes
//! ```
//!
//! # Requirements
//!
//! 1. **Append-Only**: events are never updated or deleted
//! 2. **Ordered**: the store is the sole writer of per-stream versions
//! 3. **Chained**: every append links `previous_event_id` to the stream head
//! 4. **Concurrent**: appends to different streams never block each other;
//!    same-stream appends serialize through optimistic version checks
//! 5. **Replayable**: streams read back in order, plus global secondary
//!    indexes by type and time range
//!
//! # Implementations
//!
//! - [`InMemoryEventStore`] - test isolation and replay
//! - [`FilesystemEventStore`] - durable JSON-per-event backing store

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::HotswapResult;
use crate::events::{EventDraft, VersionedEvent};

pub mod filesystem;
pub mod memory;

pub use filesystem::{FilesystemEventStore, FilesystemStoreConfig};
pub use memory::InMemoryEventStore;

/// Event store port: append-only per-stream persistence
///
/// Streams are keyed by `(aggregate_type, aggregate_id)`. The store owns the
/// canonical sequence and version counter of every stream.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event to its stream
    ///
    /// Assigns the next version, links `previous_event_id` to the current
    /// stream head, stamps the global stream position and indexes the event
    /// chronologically and by type.
    ///
    /// # Errors
    ///
    /// - [`HotswapError::Concurrency`](crate::HotswapError::Concurrency)
    ///   when `draft.expected_version` is stale
    /// - [`HotswapError::Storage`](crate::HotswapError::Storage) on I/O
    async fn append(&self, draft: EventDraft) -> HotswapResult<VersionedEvent>;

    /// Full ordered stream, oldest first; empty when the stream is unknown
    async fn stream_for(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<Vec<VersionedEvent>>;

    /// Stream suffix strictly after the given version
    async fn stream_since(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        version: u64,
    ) -> HotswapResult<Vec<VersionedEvent>>;

    /// All events of one type across all streams, chronological order
    async fn events_by_type(&self, event_type: &str) -> HotswapResult<Vec<VersionedEvent>>;

    /// All events within a time range (inclusive), chronological order
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HotswapResult<Vec<VersionedEvent>>;

    /// Current version of a stream; 0 when the stream does not exist
    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<u64>;

    /// Total number of events across all streams
    async fn total_event_count(&self) -> HotswapResult<u64>;

    /// Whether a stream has at least one event
    async fn aggregate_exists(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<bool> {
        Ok(self.current_version(aggregate_type, aggregate_id).await? > 0)
    }
}
