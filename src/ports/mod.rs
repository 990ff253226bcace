// Copyright (c) 2025 - Hotswap Core Contributors
//! Collaborator ports of the decision core
//!
//! The core decides; collaborators observe and act. Every side-effecting or
//! environment-reading concern sits behind one of these traits and is
//! resolved through the
//! [`CapabilityRegistry`](crate::registry::CapabilityRegistry), so replay
//! can substitute deterministic doubles for all of them.
//!
//! Time and identity are capabilities too: domain logic never calls
//! `Utc::now()` or `Uuid::now_v7()` directly, it asks [`Clock`] and
//! [`EventIdGenerator`]. That is what makes bug reproduction byte-identical.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{FileChangeNotification, TypeFingerprint};
use crate::errors::HotswapResult;
use crate::events::VersionedEvent;

pub mod mock;

/// Why the analyzer could not produce a fingerprint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    /// The class file could not be read from disk
    #[error("class file {path} is unreadable: {detail}")]
    Unreadable {
        /// Path the analyzer tried to read
        path: PathBuf,
        /// Underlying I/O detail
        detail: String,
    },

    /// The bytes on disk are not a well-formed class file
    #[error("class file {path} is malformed: {detail}")]
    Malformed {
        /// Path to the malformed file
        path: PathBuf,
        /// What the parser choked on
        detail: String,
    },
}

/// Extracts structural fingerprints from compiled class files
///
/// Also the source of the raw bytes to install: keeping all class-file
/// reads behind this port is what lets replay substitute scripted bytes
/// for paths that no longer exist on disk.
#[async_trait]
pub trait BytecodeAnalyzer: Send + Sync {
    /// Read the class file and extract its structural fingerprint
    async fn extract_fingerprint(&self, class_file: &Path)
        -> Result<TypeFingerprint, AnalyzerError>;

    /// Read the raw bytes to hand to the runtime
    async fn load_bytecode(&self, class_file: &Path) -> Result<Vec<u8>, AnalyzerError> {
        tokio::fs::read(class_file)
            .await
            .map_err(|err| AnalyzerError::Unreadable {
                path: class_file.to_path_buf(),
                detail: err.to_string(),
            })
    }
}

/// Outcome of a hot-swap compatibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// The change is safe to hot-swap
    Accepted,
    /// The change cannot be hot-swapped
    Rejected {
        /// Human-readable reason recorded in the BytecodeRejected event
        reason: String,
    },
}

impl ValidationVerdict {
    /// Whether the verdict allows the swap to proceed
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted)
    }
}

/// Decides whether a structural change is hot-swappable
///
/// Pure comparison of fingerprints; no I/O, no clock. `previous` is `None`
/// when the type has never been fingerprinted before.
pub trait BytecodeValidator: Send + Sync {
    /// Compare fingerprints and produce a verdict
    fn validate(
        &self,
        previous: Option<&TypeFingerprint>,
        updated: &TypeFingerprint,
    ) -> ValidationVerdict;
}

/// What the runtime did with a redefinition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedefinitionOutcome {
    /// The class was redefined in place
    Redefined {
        /// Live instances affected by the redefinition
        affected_instances: usize,
        /// Wall-clock duration of the redefinition call
        duration: Duration,
    },
    /// The runtime refused the redefinition
    Refused {
        /// The runtime's verbatim rejection reason
        reason: String,
        /// Structured error code, when the runtime provides one
        error_code: Option<String>,
    },
}

/// The running process's redefinition capability
#[async_trait]
pub trait Instrumentation: Send + Sync {
    /// Ask the runtime to redefine `class_name` with `bytecode`
    ///
    /// A refusal is an outcome, not an error: the pipeline records it as a
    /// ClassRedefinitionFailed event. Errors are reserved for transport
    /// failures talking to the runtime.
    async fn redefine_class(
        &self,
        class_name: &str,
        class_file: &Path,
        bytecode: &[u8],
    ) -> HotswapResult<RedefinitionOutcome>;
}

/// Visibility into live instances of managed types
pub trait InstanceTracker: Send + Sync {
    /// Live instances of `class_name`; `None` when undeterminable
    fn live_instance_count(&self, class_name: &str) -> Option<usize>;

    /// Types structurally depending on `class_name`
    fn dependent_types(&self, class_name: &str) -> Vec<String>;
}

/// Publishes committed events to interested observers
///
/// Emission happens strictly after the store append succeeds; an emitter
/// failure never un-commits an event.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Publish one committed event
    async fn emit(&self, event: &VersionedEvent) -> HotswapResult<()>;
}

/// Source of raw file-system observations
#[async_trait]
pub trait FileWatcher: Send + Sync {
    /// Next observation, or `None` when the watcher has shut down
    async fn next_change(&self) -> Option<FileChangeNotification>;
}

/// Source of event identities
pub trait EventIdGenerator: Send + Sync {
    /// Produce the next event id
    fn next_id(&self) -> Uuid;
}

/// Source of time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Production id source: time-ordered UUIDv7
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl EventIdGenerator for UuidV7Generator {
    fn next_id(&self) -> Uuid {
        Uuid::now_v7()
    }
}

/// Production clock: the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
