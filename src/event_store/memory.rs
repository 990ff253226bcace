// Copyright (c) 2025 - Hotswap Core Contributors
//! In-Memory Event Store
//!
//! Keeps every stream in process memory. Used for test isolation and for
//! bug-report replay, where the reproduction engine needs a fresh, empty
//! store it can seed deterministically.
//!
//! Concurrency layout: the outer map is only write-locked long enough to
//! insert a new stream entry; each stream serializes its own appends behind
//! a per-stream mutex, so appends to distinct streams never contend. The
//! chronological index is append-only and shared by the secondary queries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::errors::{HotswapError, HotswapResult};
use crate::event_store::EventStore;
use crate::events::{EventDraft, EventMetadata, VersionedEvent};

type StreamKey = (String, String);

#[derive(Default)]
struct StreamState {
    events: Vec<VersionedEvent>,
}

/// In-memory implementation of [`EventStore`]
#[derive(Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Arc<Mutex<StreamState>>>>,
    chronology: RwLock<Vec<VersionedEvent>>,
}

impl InMemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    async fn stream_handle(&self, key: &StreamKey) -> Arc<Mutex<StreamState>> {
        {
            let streams = self.streams.read().await;
            if let Some(handle) = streams.get(key) {
                return Arc::clone(handle);
            }
        }
        let mut streams = self.streams.write().await;
        Arc::clone(streams.entry(key.clone()).or_default())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, draft: EventDraft) -> HotswapResult<VersionedEvent> {
        let key = (draft.aggregate_type.clone(), draft.aggregate_id.clone());
        let handle = self.stream_handle(&key).await;

        // Serializes appends for this stream only.
        let mut stream = handle.lock().await;

        let current = stream.events.len() as u64;
        if let Some(expected) = draft.expected_version {
            if expected != current {
                return Err(HotswapError::Concurrency {
                    aggregate_type: key.0,
                    aggregate_id: key.1,
                    expected,
                    current,
                });
            }
        }

        let previous_event_id = stream.events.last().map(|e| e.metadata.event_id);
        let mut chronology = self.chronology.write().await;
        let event = VersionedEvent {
            metadata: EventMetadata {
                event_id: draft.event_id,
                aggregate_type: draft.aggregate_type,
                aggregate_id: draft.aggregate_id,
                aggregate_version: current + 1,
                timestamp: draft.timestamp,
                previous_event_id,
                schema_version: draft.schema_version,
                user_id: draft.user_id,
                correlation_id: draft.correlation_id,
                causation_id: draft.causation_id,
                stream_position: Some(chronology.len() as u64 + 1),
            },
            payload: draft.payload,
        };

        stream.events.push(event.clone());
        chronology.push(event.clone());

        debug!(
            aggregate_type = %event.metadata.aggregate_type,
            aggregate_id = %event.metadata.aggregate_id,
            version = event.metadata.aggregate_version,
            event_type = event.event_type_name(),
            "appended event"
        );

        Ok(event)
    }

    async fn stream_for(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<Vec<VersionedEvent>> {
        let key = (aggregate_type.to_string(), aggregate_id.to_string());
        let streams = self.streams.read().await;
        match streams.get(&key) {
            Some(handle) => Ok(handle.lock().await.events.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn stream_since(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        version: u64,
    ) -> HotswapResult<Vec<VersionedEvent>> {
        let events = self.stream_for(aggregate_type, aggregate_id).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.metadata.aggregate_version > version)
            .collect())
    }

    async fn events_by_type(&self, event_type: &str) -> HotswapResult<Vec<VersionedEvent>> {
        let chronology = self.chronology.read().await;
        Ok(chronology
            .iter()
            .filter(|e| e.event_type_name() == event_type)
            .cloned()
            .collect())
    }

    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HotswapResult<Vec<VersionedEvent>> {
        let chronology = self.chronology.read().await;
        Ok(chronology
            .iter()
            .filter(|e| e.metadata.timestamp >= start && e.metadata.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<u64> {
        let key = (aggregate_type.to_string(), aggregate_id.to_string());
        let streams = self.streams.read().await;
        match streams.get(&key) {
            Some(handle) => Ok(handle.lock().await.events.len() as u64),
            None => Ok(0),
        }
    }

    async fn total_event_count(&self) -> HotswapResult<u64> {
        Ok(self.chronology.read().await.len() as u64)
    }
}
