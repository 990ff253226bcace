// Copyright (c) 2025 - Hotswap Core Contributors
//! Domain value objects for the hot-swap core
//!
//! Core concepts shared by events, the decision pipeline and the cleanup
//! orchestrator:
//!
//! - [`FileChangeNotification`] - the raw fact emitted by a file watcher
//! - [`TypeFingerprint`] - structural metadata extracted from bytecode
//! - [`DeletionImpact`] / [`CleanupStrategy`] - deletion classification
//!
//! All values here are plain immutable data. Classification logic is a pure
//! function so it is deterministic under replay.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of raw file-system observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    /// File appeared on disk
    Created,
    /// File contents were modified
    Modified,
    /// File was removed from disk
    Deleted,
}

/// Raw notification from a file watcher
///
/// This is the entry point of the decision pipeline: a watcher observed
/// something on disk and reports it verbatim. The core never watches the
/// file system itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeNotification {
    /// Path to the observed file
    pub path: PathBuf,

    /// What happened to the file
    pub kind: FileChangeKind,

    /// When the watcher observed the change
    pub observed_at: DateTime<Utc>,

    /// File size at observation time (0 for deletions)
    pub file_size: u64,
}

/// Structural fingerprint of a compiled type
///
/// Extracted by the (external) bytecode analyzer; compared pairwise by the
/// (external) validator to decide whether a change is hot-swappable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFingerprint {
    /// Fully qualified name of the type
    pub class_name: String,

    /// Parent type, if any
    pub superclass: Option<String>,

    /// Implemented contracts/interfaces
    pub interfaces: Vec<String>,

    /// Declared field names
    pub declared_fields: Vec<String>,

    /// Declared operation signatures
    pub declared_methods: Vec<String>,
}

/// Derive the conventional type name from a class file path
///
/// Uses the file stem ("Foo" for "/build/Foo.class"). The file path is the
/// aggregate id for file-watch streams; it is not stable across renames.
pub fn class_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// How disruptive the cleanup after a deletion will be
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionImpact {
    /// No live instances, no dependents
    Low,
    /// Some live instances or dependents
    Medium,
    /// Many live instances or a sizable dependent set
    High,
    /// Very large blast radius
    Critical,
}

/// Recommended cleanup strategy, chosen deterministically from the impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStrategy {
    /// Immediate, aggressive cleanup (Critical/High impact)
    AggressiveImmediate,
    /// Deferred, graceful cleanup (Medium impact)
    GracefulDeferred,
    /// Batched background cleanup (Low impact)
    BackgroundBatched,
}

impl DeletionImpact {
    /// Classify a deletion from live-instance count and dependent set size
    ///
    /// An undeterminable live-instance count degrades conservatively to
    /// `High` (or `Critical` when the dependent set alone warrants it),
    /// never to `Low`.
    pub fn classify(live_instances: Option<usize>, dependent_count: usize) -> Self {
        match live_instances {
            None => {
                if dependent_count > 20 {
                    DeletionImpact::Critical
                } else {
                    DeletionImpact::High
                }
            }
            Some(count) => {
                if count > 100 || dependent_count > 20 {
                    DeletionImpact::Critical
                } else if count > 10 || dependent_count > 5 {
                    DeletionImpact::High
                } else if count > 0 || dependent_count > 0 {
                    DeletionImpact::Medium
                } else {
                    DeletionImpact::Low
                }
            }
        }
    }

    /// Map impact to the recommended cleanup strategy
    pub fn recommended_strategy(&self) -> CleanupStrategy {
        match self {
            DeletionImpact::Critical | DeletionImpact::High => CleanupStrategy::AggressiveImmediate,
            DeletionImpact::Medium => CleanupStrategy::GracefulDeferred,
            DeletionImpact::Low => CleanupStrategy::BackgroundBatched,
        }
    }
}
