// Copyright (c) 2025 - Hotswap Core Contributors
//! Filesystem Event Store
//!
//! Durable backing store: one directory per stream under the configured
//! root, one JSON document per event. File names are
//! `{version:06}-{EventType}.json`, so a lexical sort of a stream directory
//! is version order.
//!
//! ```text
//! <root>/
//!   filewatch/
//!     %2Fbuild%2FFoo.class/
//!       000001-ClassFileChanged.json
//!       000002-ClassMetadataExtracted.json
//! ```
//!
//! Version counters and stream heads are rebuilt from disk on open and kept
//! in memory afterwards; the store remains the sole writer of versions.
//! Aggregate ids are percent-escaped because file paths are the
//! conventional stream key.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{HotswapError, HotswapResult};
use crate::event_store::EventStore;
use crate::events::{EventDraft, EventMetadata, VersionedEvent};

type StreamKey = (String, String);

/// Configuration for the filesystem-backed store
#[derive(Debug, Clone)]
pub struct FilesystemStoreConfig {
    /// Root directory for all event streams
    pub root: PathBuf,
}

impl FilesystemStoreConfig {
    /// Store events under the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FilesystemStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("eventstore"),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct StreamHead {
    version: u64,
    last_event_id: Option<Uuid>,
}

/// Filesystem-backed implementation of [`EventStore`]
pub struct FilesystemEventStore {
    root: PathBuf,
    heads: RwLock<HashMap<StreamKey, Arc<Mutex<StreamHead>>>>,
    position: AtomicU64,
}

/// Escape an aggregate id for use as a directory name
fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            ':' => out.push_str("%3A"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse of [`escape_id`]
fn unescape_id(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '%' {
            let code: String = chars.by_ref().take(2).collect();
            match code.as_str() {
                "25" => out.push('%'),
                "2F" => out.push('/'),
                "5C" => out.push('\\'),
                "3A" => out.push(':'),
                other => {
                    out.push('%');
                    out.push_str(other);
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}

impl FilesystemEventStore {
    /// Open (or create) a store rooted at `config.root`
    ///
    /// Scans existing stream directories to rebuild version counters and
    /// stream heads.
    pub async fn open(config: FilesystemStoreConfig) -> HotswapResult<Self> {
        tokio::fs::create_dir_all(&config.root).await?;

        let mut heads: HashMap<StreamKey, Arc<Mutex<StreamHead>>> = HashMap::new();
        let mut total = 0u64;

        let mut type_dirs = tokio::fs::read_dir(&config.root).await?;
        while let Some(type_dir) = type_dirs.next_entry().await? {
            if !type_dir.file_type().await?.is_dir() {
                continue;
            }
            let aggregate_type = type_dir.file_name().to_string_lossy().into_owned();

            let mut id_dirs = tokio::fs::read_dir(type_dir.path()).await?;
            while let Some(id_dir) = id_dirs.next_entry().await? {
                if !id_dir.file_type().await?.is_dir() {
                    continue;
                }
                let aggregate_id = unescape_id(&id_dir.file_name().to_string_lossy());

                let mut files = Vec::new();
                let mut entries = tokio::fs::read_dir(id_dir.path()).await?;
                while let Some(entry) = entries.next_entry().await? {
                    if entry.file_name().to_string_lossy().ends_with(".json") {
                        files.push(entry.path());
                    }
                }
                files.sort();
                total += files.len() as u64;

                let last_event_id = match files.last() {
                    Some(path) => {
                        let bytes = tokio::fs::read(path).await?;
                        let event: VersionedEvent = serde_json::from_slice(&bytes)
                            .map_err(|e| HotswapError::Deserialization(e.to_string()))?;
                        Some(event.metadata.event_id)
                    }
                    None => None,
                };

                heads.insert(
                    (aggregate_type.clone(), aggregate_id),
                    Arc::new(Mutex::new(StreamHead {
                        version: files.len() as u64,
                        last_event_id,
                    })),
                );
            }
        }

        info!(
            root = %config.root.display(),
            streams = heads.len(),
            events = total,
            "opened filesystem event store"
        );

        Ok(Self {
            root: config.root,
            heads: RwLock::new(heads),
            position: AtomicU64::new(total),
        })
    }

    fn stream_dir(&self, aggregate_type: &str, aggregate_id: &str) -> PathBuf {
        self.root.join(aggregate_type).join(escape_id(aggregate_id))
    }

    async fn head_handle(&self, key: &StreamKey) -> Arc<Mutex<StreamHead>> {
        {
            let heads = self.heads.read().await;
            if let Some(handle) = heads.get(key) {
                return Arc::clone(handle);
            }
        }
        let mut heads = self.heads.write().await;
        Arc::clone(heads.entry(key.clone()).or_default())
    }

    async fn read_stream_dir(&self, dir: PathBuf) -> HotswapResult<Vec<VersionedEvent>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(".json") {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut events = Vec::with_capacity(files.len());
        for path in files {
            let bytes = tokio::fs::read(&path).await?;
            let event: VersionedEvent = serde_json::from_slice(&bytes)
                .map_err(|e| HotswapError::Deserialization(e.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }

    async fn read_all(&self) -> HotswapResult<Vec<VersionedEvent>> {
        let keys: Vec<StreamKey> = {
            let heads = self.heads.read().await;
            heads.keys().cloned().collect()
        };

        let mut all = Vec::new();
        for (aggregate_type, aggregate_id) in keys {
            let dir = self.stream_dir(&aggregate_type, &aggregate_id);
            all.extend(self.read_stream_dir(dir).await?);
        }
        all.sort_by_key(|e| e.metadata.stream_position);
        Ok(all)
    }
}

#[async_trait]
impl EventStore for FilesystemEventStore {
    async fn append(&self, draft: EventDraft) -> HotswapResult<VersionedEvent> {
        let key = (draft.aggregate_type.clone(), draft.aggregate_id.clone());
        let handle = self.head_handle(&key).await;

        let mut head = handle.lock().await;

        if let Some(expected) = draft.expected_version {
            if expected != head.version {
                return Err(HotswapError::Concurrency {
                    aggregate_type: key.0,
                    aggregate_id: key.1,
                    expected,
                    current: head.version,
                });
            }
        }

        let version = head.version + 1;
        let position = self.position.fetch_add(1, Ordering::SeqCst) + 1;
        let event = VersionedEvent {
            metadata: EventMetadata {
                event_id: draft.event_id,
                aggregate_type: draft.aggregate_type,
                aggregate_id: draft.aggregate_id,
                aggregate_version: version,
                timestamp: draft.timestamp,
                previous_event_id: head.last_event_id,
                schema_version: draft.schema_version,
                user_id: draft.user_id,
                correlation_id: draft.correlation_id,
                causation_id: draft.causation_id,
                stream_position: Some(position),
            },
            payload: draft.payload,
        };

        let dir = self.stream_dir(&event.metadata.aggregate_type, &event.metadata.aggregate_id);
        tokio::fs::create_dir_all(&dir).await?;
        let file = dir.join(format!("{:06}-{}.json", version, event.event_type_name()));
        let bytes =
            serde_json::to_vec_pretty(&event).map_err(|e| HotswapError::Serialization(e.to_string()))?;
        tokio::fs::write(&file, bytes).await?;

        head.version = version;
        head.last_event_id = Some(event.metadata.event_id);

        debug!(
            file = %file.display(),
            version,
            event_type = event.event_type_name(),
            "persisted event"
        );

        Ok(event)
    }

    async fn stream_for(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<Vec<VersionedEvent>> {
        self.read_stream_dir(self.stream_dir(aggregate_type, aggregate_id))
            .await
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
        let all = self.read_all().await?;
        Ok(all
            .into_iter()
            .filter(|e| e.event_type_name() == event_type)
            .collect())
    }

    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HotswapResult<Vec<VersionedEvent>> {
        let all = self.read_all().await?;
        Ok(all
            .into_iter()
            .filter(|e| e.metadata.timestamp >= start && e.metadata.timestamp <= end)
            .collect())
    }

    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> HotswapResult<u64> {
        let key = (aggregate_type.to_string(), aggregate_id.to_string());
        let heads = self.heads.read().await;
        match heads.get(&key) {
            Some(handle) => Ok(handle.lock().await.version),
            None => Ok(0),
        }
    }

    async fn total_event_count(&self) -> HotswapResult<u64> {
        Ok(self.position.load(Ordering::SeqCst))
    }
}
