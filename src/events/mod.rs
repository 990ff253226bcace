// Copyright (c) 2025 - Hotswap Core Contributors
//! Hot-Swap Domain Events
//!
//! Every fact in the system is an immutable domain event. Events follow
//! event sourcing practice:
//!
//! 1. **Events are immutable**: Once created, events never change
//! 2. **Events are past tense**: Named for what happened (`BytecodeRejected`,
//!    not `RejectBytecode`)
//! 3. **Events are versioned per stream**: the store assigns a monotonic
//!    `aggregate_version` starting at 1
//! 4. **Events are causally chained**: version *n* > 1 carries the event id
//!    of version *n*−1 as `previous_event_id`
//! 5. **Events are facts**: rejection and failure are ordinary data, not
//!    control flow
//!
//! # Event Flow
//!
//! ```text
//! FileChangeNotification → DecisionPipeline → HotswapEvent → EventStore
//!                                                  ↓
//!                                             EventEmitter
//! ```
//!
//! # Correlation and Causation
//!
//! - **correlation_id**: groups every event of one pipeline run
//! - **causation_id**: the triggering event that caused this event
//! - **previous_event_id**: the per-stream causal chain, assigned by the
//!   store alongside the version
//!
//! ```text
//! ClassFileChanged        version 1   previous: None
//!   ↓
//! ClassMetadataExtracted  version 2   previous: id of version 1
//!   ↓
//! BytecodeValidated       version 3   previous: id of version 2
//! ```
//!
//! # Module Organization
//!
//! - [`metadata`] - event-sourcing metadata, stored envelope, append draft
//! - [`hotswap`] - the tagged-variant payload enum and per-variant structs

pub mod hotswap;
pub mod metadata;

pub use hotswap::{
    BytecodeRejected, BytecodeValidated, ClassFileChanged, ClassFileDeleted,
    ClassMetadataExtracted, ClassRedefinitionFailed, ClassRedefinitionSucceeded, HotSwapRequested,
    HotswapEvent, InstanceUpdateMethod, InstancesUpdated,
};
pub use metadata::{EventDraft, EventMetadata, VersionedEvent, FILEWATCH_AGGREGATE};
