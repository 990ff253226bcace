// Copyright (c) 2025 - Hotswap Core Contributors
//! Event-sourced decision core for bytecode hot-swapping
//!
//! Watches for class-file changes (through an external watcher), decides
//! whether each change is hot-swappable, asks the running process to
//! redefine the class, and records every step as a causally-chained event
//! in an append-only store. Failures become replayable bug reports instead
//! of stack traces.
//!
//! Components, leaf-first:
//!
//! - [`events`] - the versioned event model and hot-swap event variants
//! - [`event_store`] - append-only per-stream persistence with
//!   store-assigned versioning and optimistic concurrency
//! - [`registry`] - the capability resolution boundary
//! - [`ports`] - collaborator traits (analyzer, validator, instrumentation,
//!   watcher, emitter, clock, ids) plus deterministic doubles
//! - [`pipeline`] - the decision state machine driving changes to terminal
//!   outcomes
//! - [`cleanup`] - deletion impact assessment and strategy selection
//! - [`bugreport`] / [`replay`] - event-sourced defect capture and
//!   given/when/then reproduction
//! - [`subjects`] / [`nats`] - the NATS publishing surface

pub mod bugreport;
pub mod cleanup;
pub mod domain;
pub mod errors;
pub mod event_store;
pub mod events;
pub mod nats;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod replay;
pub mod subjects;

// Re-export commonly used types
pub use bugreport::{BugCategory, BugReport, BugReportGenerator, BugSeverity, EventSnapshot};
pub use cleanup::{CleanupDecision, CleanupOrchestrator};
pub use domain::{
    class_name_from_path, CleanupStrategy, DeletionImpact, FileChangeKind, FileChangeNotification,
    TypeFingerprint,
};
pub use errors::{HotswapError, HotswapResult};
pub use event_store::{EventStore, FilesystemEventStore, FilesystemStoreConfig, InMemoryEventStore};
pub use events::{EventDraft, EventMetadata, HotswapEvent, VersionedEvent, FILEWATCH_AGGREGATE};
pub use nats::{NatsClient, NatsConfig, NatsEventEmitter};
pub use pipeline::{DecisionPipeline, PipelineConfig, SwapLifecycle, SwapOutcome};
pub use registry::CapabilityRegistry;
pub use replay::{BugReproductionEngine, ReplayResult, ReplayVerdict};
