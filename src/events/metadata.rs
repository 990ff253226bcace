// Copyright (c) 2025 - Hotswap Core Contributors
//! Event-sourcing metadata and the stored envelope
//!
//! [`EventMetadata`] carries everything the event-sourcing substrate needs
//! to order, chain and trace an event. [`VersionedEvent`] is the unit the
//! store persists: metadata plus the domain payload. [`EventDraft`] is what
//! callers hand to the store; the store alone assigns `aggregate_version`,
//! `previous_event_id` and `stream_position`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::hotswap::HotswapEvent;

/// Conventional aggregate type for file-watch streams
pub const FILEWATCH_AGGREGATE: &str = "filewatch";

/// Event-sourcing metadata attached to every stored event
///
/// # Invariants
///
/// - `aggregate_version` is strictly increasing by one per append within a
///   stream, starting at 1, and is assigned by the store, never the caller
/// - version 1 has `previous_event_id: None`
/// - version *n* > 1 references the event id of version *n*−1 of the same
///   stream
///
/// Nullable fields are explicit `Option`s, never sentinels, so the chain
/// invariant stays mechanically checkable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique identifier for this event instance (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Logical stream name (e.g. "filewatch")
    pub aggregate_type: String,

    /// Stream key (e.g. the watched file path)
    pub aggregate_id: String,

    /// Monotonic per-stream counter, starting at 1
    pub aggregate_version: u64,

    /// When the event occurred
    pub timestamp: DateTime<Utc>,

    /// Event id of the previous event in this stream (None at version 1)
    pub previous_event_id: Option<Uuid>,

    /// Version of the event schema, for migration
    pub schema_version: u32,

    /// User who triggered this event, if known
    pub user_id: Option<String>,

    /// Groups related events across aggregates
    pub correlation_id: Option<Uuid>,

    /// Event that caused this event (command-to-event link)
    pub causation_id: Option<Uuid>,

    /// Store-assigned global chronological position
    pub stream_position: Option<u64>,
}

impl EventMetadata {
    /// Whether this is the first event of its stream
    pub fn is_initial(&self) -> bool {
        self.aggregate_version == 1
    }
}

/// Stored event envelope: metadata plus domain payload
///
/// The payload's serde tag is the persisted type discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEvent {
    /// Event-sourcing metadata
    pub metadata: EventMetadata,

    /// The domain fact
    pub payload: HotswapEvent,
}

impl VersionedEvent {
    /// Human-readable event type name (the payload discriminant)
    pub fn event_type_name(&self) -> &'static str {
        self.payload.event_type_name()
    }
}

/// What a caller hands to the store for appending
///
/// The draft carries the occurrence facts (payload, timestamp, tracing ids)
/// plus the caller's assumed prior stream version for optimistic
/// concurrency. Version, previous-event link and stream position are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// Logical stream name
    pub aggregate_type: String,

    /// Stream key
    pub aggregate_id: String,

    /// Caller's assumed current version; `None` skips the check
    pub expected_version: Option<u64>,

    /// Pre-generated event id (from the registry-resolved id generator)
    pub event_id: Uuid,

    /// When the fact occurred
    pub timestamp: DateTime<Utc>,

    /// Schema version of the payload
    pub schema_version: u32,

    /// User who triggered the event, if known
    pub user_id: Option<String>,

    /// Correlation id for the pipeline run
    pub correlation_id: Option<Uuid>,

    /// Event that caused this one
    pub causation_id: Option<Uuid>,

    /// The domain fact
    pub payload: HotswapEvent,
}

impl EventDraft {
    /// Create a draft with no tracing context and no concurrency check
    pub fn new(
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        event_id: Uuid,
        timestamp: DateTime<Utc>,
        payload: HotswapEvent,
    ) -> Self {
        Self {
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            expected_version: None,
            event_id,
            timestamp,
            schema_version: 1,
            user_id: None,
            correlation_id: None,
            causation_id: None,
            payload,
        }
    }

    /// Require the stream to be at `version` when the append lands
    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Attach a correlation id
    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Attach a causation id
    pub fn with_causation(mut self, causation_id: Uuid) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    /// Attach a user id
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
