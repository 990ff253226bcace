// Copyright (c) 2025 - Hotswap Core Contributors
//! Hot-swap domain event payloads
//!
//! One struct per fact, wrapped in the tagged-variant [`HotswapEvent`] enum.
//! Dispatch on the variant goes through explicit match tables, never runtime
//! type inspection.
//!
//! Two variants are *response events*: [`HotSwapRequested`] answers a
//! specific [`ClassFileChanged`] via `triggering_change_id`, modeling
//! request/response causality independent of stream versioning.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CleanupStrategy, DeletionImpact, TypeFingerprint};

/// Hot-Swap Domain Events
///
/// Polymorphic payload for everything the decision pipeline and the cleanup
/// orchestrator record. Each variant is strongly typed and immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HotswapEvent {
    /// A .class file was modified on disk
    ClassFileChanged(ClassFileChanged),

    /// A .class file was removed from disk (with impact assessment)
    ClassFileDeleted(ClassFileDeleted),

    /// Structural metadata was extracted from the changed bytecode
    ClassMetadataExtracted(ClassMetadataExtracted),

    /// The validator accepted the change for hot-swap
    BytecodeValidated(BytecodeValidated),

    /// The validator rejected the change (terminal for this attempt)
    BytecodeRejected(BytecodeRejected),

    /// Redefinition was requested from the running process
    HotSwapRequested(HotSwapRequested),

    /// The runtime redefined the class successfully
    ClassRedefinitionSucceeded(ClassRedefinitionSucceeded),

    /// The runtime refused the redefinition (terminal for this attempt)
    ClassRedefinitionFailed(ClassRedefinitionFailed),

    /// Existing live instances were migrated/retained after redefinition
    InstancesUpdated(InstancesUpdated),
}

impl HotswapEvent {
    /// Human-readable event type name (matches the serde tag's PascalCase
    /// source, used for the store's type index and emitter subjects)
    pub fn event_type_name(&self) -> &'static str {
        match self {
            HotswapEvent::ClassFileChanged(_) => "ClassFileChanged",
            HotswapEvent::ClassFileDeleted(_) => "ClassFileDeleted",
            HotswapEvent::ClassMetadataExtracted(_) => "ClassMetadataExtracted",
            HotswapEvent::BytecodeValidated(_) => "BytecodeValidated",
            HotswapEvent::BytecodeRejected(_) => "BytecodeRejected",
            HotswapEvent::HotSwapRequested(_) => "HotSwapRequested",
            HotswapEvent::ClassRedefinitionSucceeded(_) => "ClassRedefinitionSucceeded",
            HotswapEvent::ClassRedefinitionFailed(_) => "ClassRedefinitionFailed",
            HotswapEvent::InstancesUpdated(_) => "InstancesUpdated",
        }
    }

    /// Extract the class name from any event variant
    pub fn class_name(&self) -> &str {
        match self {
            HotswapEvent::ClassFileChanged(e) => &e.class_name,
            HotswapEvent::ClassFileDeleted(e) => &e.class_name,
            HotswapEvent::ClassMetadataExtracted(e) => &e.class_name,
            HotswapEvent::BytecodeValidated(e) => &e.class_name,
            HotswapEvent::BytecodeRejected(e) => &e.class_name,
            HotswapEvent::HotSwapRequested(e) => &e.class_name,
            HotswapEvent::ClassRedefinitionSucceeded(e) => &e.class_name,
            HotswapEvent::ClassRedefinitionFailed(e) => &e.class_name,
            HotswapEvent::InstancesUpdated(e) => &e.class_name,
        }
    }

    /// Whether this event terminates a swap attempt without a redefinition
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            HotswapEvent::BytecodeRejected(_) | HotswapEvent::ClassRedefinitionFailed(_)
        )
    }
}

/// A .class file was modified on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFileChanged {
    /// Path to the modified .class file
    pub class_file: PathBuf,

    /// Type name derived from the file name
    pub class_name: String,

    /// Size of the file at detection time, in bytes
    pub file_size: u64,

    /// When the change was detected
    pub detected_at: DateTime<Utc>,
}

/// A .class file was removed from disk
///
/// Recorded by the cleanup orchestrator together with its deterministic
/// impact assessment and strategy recommendation. Executing the cleanup is
/// delegated to external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFileDeleted {
    /// Path to the deleted .class file
    pub class_file: PathBuf,

    /// Type name derived from the file name
    pub class_name: String,

    /// When the deletion was detected
    pub detected_at: DateTime<Utc>,

    /// Whether the deletion was expected (the file was already watched)
    pub expected_deletion: bool,

    /// Live instances at deletion time, if determinable
    pub live_instances: Option<usize>,

    /// Types structurally depending on the deleted type
    pub dependent_types: Vec<String>,

    /// Assessed cleanup disruption
    pub impact: DeletionImpact,

    /// Recommended cleanup strategy
    pub strategy: CleanupStrategy,
}

/// Structural metadata was extracted from changed bytecode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadataExtracted {
    /// Type name the fingerprint describes
    pub class_name: String,

    /// The structural fingerprint
    pub fingerprint: TypeFingerprint,

    /// When extraction completed
    pub extracted_at: DateTime<Utc>,
}

/// The validator accepted the change for hot-swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytecodeValidated {
    /// Path to the validated .class file
    pub class_file: PathBuf,

    /// Type name
    pub class_name: String,

    /// Always true for this variant; echoed for the audit trail
    pub valid_for_hot_swap: bool,

    /// Fingerprint the verdict was based on
    pub fingerprint: TypeFingerprint,

    /// When validation completed
    pub validated_at: DateTime<Utc>,
}

/// The validator (or an unreadable file) rejected the change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytecodeRejected {
    /// Path to the rejected .class file
    pub class_file: PathBuf,

    /// Type name
    pub class_name: String,

    /// Always false for this variant; forced at construction
    pub valid_for_hot_swap: bool,

    /// Human-readable rejection reason
    pub reason: String,

    /// When the rejection was recorded
    pub rejected_at: DateTime<Utc>,
}

impl BytecodeRejected {
    /// Build a rejection; `valid_for_hot_swap` is forced to false
    pub fn new(
        class_file: PathBuf,
        class_name: impl Into<String>,
        reason: impl Into<String>,
        rejected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            class_file,
            class_name: class_name.into(),
            valid_for_hot_swap: false,
            reason: reason.into(),
            rejected_at,
        }
    }
}

/// Redefinition was requested from the running process
///
/// A response event: `triggering_change_id` is the event id of the exact
/// [`ClassFileChanged`] this request answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotSwapRequested {
    /// Path to the .class file being hot-swapped
    pub class_file: PathBuf,

    /// Fully qualified name of the class being hot-swapped
    pub class_name: String,

    /// New bytecode to install
    pub new_bytecode: Vec<u8>,

    /// Why the swap was requested
    pub request_reason: String,

    /// Event id of the change this request answers
    pub triggering_change_id: Uuid,

    /// When the request was issued
    pub requested_at: DateTime<Utc>,
}

/// The runtime redefined the class successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRedefinitionSucceeded {
    /// Redefined type name
    pub class_name: String,

    /// Path to the source .class file
    pub class_file: PathBuf,

    /// Live instances affected by the redefinition
    pub affected_instances: usize,

    /// Wall-clock duration of the redefinition call, in milliseconds
    pub duration_ms: u64,

    /// When the redefinition completed
    pub completed_at: DateTime<Utc>,
}

/// The runtime refused the redefinition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRedefinitionFailed {
    /// Type name the runtime refused to redefine
    pub class_name: String,

    /// Path to the source .class file
    pub class_file: PathBuf,

    /// The runtime's verbatim rejection reason (e.g. schema change)
    pub failure_reason: String,

    /// Structured runtime error code, when the runtime provides one
    pub jvm_error_code: Option<String>,

    /// When the failure was recorded
    pub failed_at: DateTime<Utc>,
}

/// How live instances were brought up to date after a redefinition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceUpdateMethod {
    /// The runtime migrated instances in place
    Automatic,
    /// Instance state was re-seeded reflectively
    Reflection,
    /// No live instances required updating
    NoUpdateNeeded,
}

/// Existing live instances were migrated/retained after redefinition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancesUpdated {
    /// Redefined type name
    pub class_name: String,

    /// Instances migrated to the new definition
    pub updated_instances: usize,

    /// Instances retained untouched
    pub preserved_instances: usize,

    /// How the update was performed
    pub update_method: InstanceUpdateMethod,

    /// When the instance update completed
    pub completed_at: DateTime<Utc>,
}
