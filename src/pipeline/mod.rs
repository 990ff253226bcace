// Copyright (c) 2025 - Hotswap Core Contributors
//! Decision pipeline
//!
//! Consumes raw file-change notifications and drives each one through the
//! swap lifecycle, appending a causally-linked event for every step:
//!
//! ```text
//! ClassFileChanged → ClassMetadataExtracted → BytecodeValidated → HotSwapRequested
//!        ↓                    ↓                      ↓                   ↓
//!  BytecodeRejected    BytecodeRejected      BytecodeRejected   ClassRedefinitionSucceeded
//!                                                               ClassRedefinitionFailed
//! ```
//!
//! Every capability the pipeline touches (store, analyzer, validator,
//! instrumentation, emitters, clock, id generator) is resolved through the
//! [`CapabilityRegistry`], which is what makes the whole run replayable
//! with deterministic doubles.
//!
//! Ordering: changes to the same file are processed strictly in arrival
//! order; the optimistic version check on every append enforces it. Changes
//! to different files are independent streams and proceed concurrently.
//!
//! Failure doctrine: analyzer errors, unreadable files, validator
//! rejections and runtime refusals all become terminal, recorded outcome
//! events, never unhandled faults. A lost append race is retried a bounded
//! number of times against the fresh stream head.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::bugreport::{BugReport, BugReportGenerator};
use crate::domain::{class_name_from_path, FileChangeKind, FileChangeNotification};
use crate::errors::{HotswapError, HotswapResult};
use crate::event_store::EventStore;
use crate::events::hotswap::{
    BytecodeRejected, BytecodeValidated, ClassFileChanged, ClassMetadataExtracted,
    ClassRedefinitionFailed, ClassRedefinitionSucceeded, HotSwapRequested, HotswapEvent,
    InstanceUpdateMethod, InstancesUpdated,
};
use crate::events::{EventDraft, VersionedEvent, FILEWATCH_AGGREGATE};
use crate::ports::{
    BytecodeAnalyzer, BytecodeValidator, Clock, EventEmitter, EventIdGenerator, InstanceTracker,
    Instrumentation, RedefinitionOutcome, ValidationVerdict,
};
use crate::registry::CapabilityRegistry;

pub mod lifecycle;

pub use lifecycle::{SwapLifecycle, TransitionError};

/// Tuning knobs for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded retries after a lost optimistic-concurrency race.
    ///
    /// Retries are immediate against the re-read stream head; the conflict
    /// window is a single in-process append, so backoff buys nothing.
    pub max_append_retries: u32,

    /// User recorded on every appended event, if known
    pub user_id: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_append_retries: 3,
            user_id: None,
        }
    }
}

/// Terminal result of driving one change through the pipeline
#[derive(Debug, Clone)]
pub enum SwapOutcome {
    /// The class was redefined and live instances were updated
    Applied {
        /// Events appended by this run, in order
        events: Vec<VersionedEvent>,
    },
    /// The change was rejected before reaching the runtime
    Rejected {
        /// Events appended by this run, in order
        events: Vec<VersionedEvent>,
        /// Auto-generated replayable defect record
        report: BugReport,
    },
    /// The runtime refused the redefinition
    Failed {
        /// Events appended by this run, in order
        events: Vec<VersionedEvent>,
        /// Auto-generated replayable defect record
        report: BugReport,
    },
}

impl SwapOutcome {
    /// Events appended by this run, in order
    pub fn events(&self) -> &[VersionedEvent] {
        match self {
            SwapOutcome::Applied { events }
            | SwapOutcome::Rejected { events, .. }
            | SwapOutcome::Failed { events, .. } => events,
        }
    }

    /// Whether the swap landed in the running process
    pub fn is_applied(&self) -> bool {
        matches!(self, SwapOutcome::Applied { .. })
    }

    /// The defect record, when the run did not apply
    pub fn report(&self) -> Option<&BugReport> {
        match self {
            SwapOutcome::Applied { .. } => None,
            SwapOutcome::Rejected { report, .. } | SwapOutcome::Failed { report, .. } => {
                Some(report)
            }
        }
    }
}

/// Append one event with bounded retry, then fan it out to the emitters
///
/// The draft's `expected_version` is overwritten with the freshly read
/// stream head on every attempt. Emitter failures are logged and swallowed;
/// an emitter never un-commits an append.
pub(crate) async fn record_event(
    store: &Arc<dyn EventStore>,
    emitters: &[Arc<dyn EventEmitter>],
    draft: EventDraft,
    max_retries: u32,
) -> HotswapResult<VersionedEvent> {
    let mut attempts = 0;
    loop {
        let current = store
            .current_version(&draft.aggregate_type, &draft.aggregate_id)
            .await?;
        let attempt = draft.clone().with_expected_version(current);

        match store.append(attempt).await {
            Ok(event) => {
                for emitter in emitters {
                    if let Err(err) = emitter.emit(&event).await {
                        warn!(
                            event_type = event.event_type_name(),
                            aggregate_id = %event.metadata.aggregate_id,
                            error = %err,
                            "emitter failed; append stands"
                        );
                    }
                }
                return Ok(event);
            }
            Err(err @ HotswapError::Concurrency { .. }) => {
                attempts += 1;
                if attempts >= max_retries {
                    return Err(err);
                }
                debug!(
                    aggregate_id = %draft.aggregate_id,
                    attempt = attempts,
                    "append lost a version race; retrying against fresh head"
                );
            }
            Err(err) => return Err(err),
        }
    }
}

/// Drives file changes through the swap lifecycle
///
/// One pipeline instance serves all streams; per-stream ordering comes from
/// the store's optimistic versioning, not from pipeline-level locking.
pub struct DecisionPipeline {
    registry: Arc<CapabilityRegistry>,
    config: PipelineConfig,
}

impl DecisionPipeline {
    /// Pipeline with default configuration
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self::with_config(registry, PipelineConfig::default())
    }

    /// Pipeline with explicit configuration
    pub fn with_config(registry: Arc<CapabilityRegistry>, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Drive one change notification to a terminal, recorded outcome
    ///
    /// Deletion notifications belong to the
    /// [`CleanupOrchestrator`](crate::cleanup::CleanupOrchestrator); handing
    /// one here is a contract error.
    ///
    /// # Errors
    ///
    /// Only infrastructure and contract errors surface as `Err`: a missing
    /// capability, a store that keeps losing the version race past the
    /// retry budget, or I/O failure inside the store. Domain failures
    /// (rejection, runtime refusal) are `Ok` outcomes carrying the recorded
    /// events and a bug report.
    #[instrument(skip(self, notification), fields(path = %notification.path.display()))]
    pub async fn process_change(
        &self,
        notification: FileChangeNotification,
    ) -> HotswapResult<SwapOutcome> {
        if notification.kind == FileChangeKind::Deleted {
            return Err(HotswapError::Configuration(
                "deletion notifications are handled by the cleanup orchestrator".to_string(),
            ));
        }

        let store = self.registry.resolve::<dyn EventStore>()?;
        let analyzer = self.registry.resolve::<dyn BytecodeAnalyzer>()?;
        let validator = self.registry.resolve::<dyn BytecodeValidator>()?;
        let instrumentation = self.registry.resolve::<dyn Instrumentation>()?;
        let tracker = self.registry.resolve::<dyn InstanceTracker>()?;
        let ids = self.registry.resolve::<dyn EventIdGenerator>()?;
        let clock = self.registry.resolve::<dyn Clock>()?;
        let emitters = self.registry.resolve_all::<dyn EventEmitter>();

        let aggregate_id = notification.path.to_string_lossy().into_owned();
        let class_name = class_name_from_path(&notification.path);
        let correlation = ids.next_id();
        let mut run = RunRecorder {
            store: &store,
            emitters: &emitters,
            ids: &ids,
            config: &self.config,
            aggregate_id: &aggregate_id,
            correlation,
            events: Vec::new(),
            state: SwapLifecycle::Detected,
        };

        // Prior fingerprint, for the validator's pairwise comparison.
        let previous_fingerprint = store
            .stream_for(FILEWATCH_AGGREGATE, &aggregate_id)
            .await?
            .iter()
            .rev()
            .find_map(|event| match &event.payload {
                HotswapEvent::ClassMetadataExtracted(e) => Some(e.fingerprint.clone()),
                _ => None,
            });

        let changed = run
            .append(
                None,
                SwapLifecycle::Detected,
                HotswapEvent::ClassFileChanged(ClassFileChanged {
                    class_file: notification.path.clone(),
                    class_name: class_name.clone(),
                    file_size: notification.file_size,
                    detected_at: notification.observed_at,
                }),
            )
            .await?;
        let trigger_id = changed.metadata.event_id;

        let fingerprint = match analyzer.extract_fingerprint(&notification.path).await {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                return self
                    .reject(&mut run, clock.now(), &notification, &class_name, trigger_id, err.to_string())
                    .await;
            }
        };

        let new_bytecode = match analyzer.load_bytecode(&notification.path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                return self
                    .reject(&mut run, clock.now(), &notification, &class_name, trigger_id, err.to_string())
                    .await;
            }
        };

        let extracted = run
            .append(
                Some(trigger_id),
                SwapLifecycle::MetadataExtracted,
                HotswapEvent::ClassMetadataExtracted(ClassMetadataExtracted {
                    class_name: class_name.clone(),
                    fingerprint: fingerprint.clone(),
                    extracted_at: clock.now(),
                }),
            )
            .await?;

        match validator.validate(previous_fingerprint.as_ref(), &fingerprint) {
            ValidationVerdict::Accepted => {}
            ValidationVerdict::Rejected { reason } => {
                return self
                    .reject(
                        &mut run,
                        clock.now(),
                        &notification,
                        &class_name,
                        trigger_id,
                        reason,
                    )
                    .await;
            }
        }

        let validated = run
            .append(
                Some(extracted.metadata.event_id),
                SwapLifecycle::Validated,
                HotswapEvent::BytecodeValidated(BytecodeValidated {
                    class_file: notification.path.clone(),
                    class_name: class_name.clone(),
                    valid_for_hot_swap: true,
                    fingerprint,
                    validated_at: clock.now(),
                }),
            )
            .await?;

        let requested = run
            .append(
                Some(validated.metadata.event_id),
                SwapLifecycle::HotSwapRequested,
                HotswapEvent::HotSwapRequested(HotSwapRequested {
                    class_file: notification.path.clone(),
                    class_name: class_name.clone(),
                    new_bytecode: new_bytecode.clone(),
                    request_reason: "class file changed on disk".to_string(),
                    triggering_change_id: trigger_id,
                    requested_at: clock.now(),
                }),
            )
            .await?;

        // Once the request is recorded the attempt runs to a recorded
        // outcome; a transport fault is converted, never re-thrown.
        let outcome = match instrumentation
            .redefine_class(&class_name, &notification.path, &new_bytecode)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => RedefinitionOutcome::Refused {
                reason: format!("instrumentation transport failed: {err}"),
                error_code: None,
            },
        };

        match outcome {
            RedefinitionOutcome::Redefined {
                affected_instances,
                duration,
            } => {
                let succeeded = run
                    .append(
                        Some(requested.metadata.event_id),
                        SwapLifecycle::Redefined,
                        HotswapEvent::ClassRedefinitionSucceeded(ClassRedefinitionSucceeded {
                            class_name: class_name.clone(),
                            class_file: notification.path.clone(),
                            affected_instances,
                            duration_ms: duration.as_millis() as u64,
                            completed_at: clock.now(),
                        }),
                    )
                    .await?;

                // Retained = live minus migrated, when the tracker can see
                // the live population at all.
                let preserved_instances = tracker
                    .live_instance_count(&class_name)
                    .map_or(0, |live| live.saturating_sub(affected_instances));
                let update_method = if affected_instances == 0 {
                    InstanceUpdateMethod::NoUpdateNeeded
                } else {
                    InstanceUpdateMethod::Automatic
                };
                run.append(
                    Some(succeeded.metadata.event_id),
                    SwapLifecycle::InstancesUpdated,
                    HotswapEvent::InstancesUpdated(InstancesUpdated {
                        class_name: class_name.clone(),
                        updated_instances: affected_instances,
                        preserved_instances,
                        update_method,
                        completed_at: clock.now(),
                    }),
                )
                .await?;

                info!(class_name = %class_name, affected_instances, "hot-swap applied");
                Ok(SwapOutcome::Applied { events: run.events })
            }
            RedefinitionOutcome::Refused { reason, error_code } => {
                run.append(
                    Some(requested.metadata.event_id),
                    SwapLifecycle::RedefinitionFailed,
                    HotswapEvent::ClassRedefinitionFailed(ClassRedefinitionFailed {
                        class_name: class_name.clone(),
                        class_file: notification.path.clone(),
                        failure_reason: reason.clone(),
                        jvm_error_code: error_code,
                        failed_at: clock.now(),
                    }),
                )
                .await?;

                warn!(class_name = %class_name, reason = %reason, "runtime refused redefinition");
                let report = self.report_generator()?.generate(
                    format!("runtime refused redefinition of {class_name}"),
                    run.events.clone(),
                );
                Ok(SwapOutcome::Failed {
                    events: run.events,
                    report,
                })
            }
        }
    }

    /// Record a terminal rejection and wrap it in an outcome plus report
    async fn reject(
        &self,
        run: &mut RunRecorder<'_>,
        at: chrono::DateTime<chrono::Utc>,
        notification: &FileChangeNotification,
        class_name: &str,
        trigger_id: uuid::Uuid,
        reason: String,
    ) -> HotswapResult<SwapOutcome> {
        run.append(
            Some(trigger_id),
            SwapLifecycle::Rejected,
            HotswapEvent::BytecodeRejected(BytecodeRejected::new(
                notification.path.clone(),
                class_name,
                reason.clone(),
                at,
            )),
        )
        .await?;

        info!(class_name = %class_name, reason = %reason, "change rejected");
        let report = self.report_generator()?.generate(
            format!("hot-swap of {class_name} rejected"),
            run.events.clone(),
        );
        Ok(SwapOutcome::Rejected {
            events: run.events.clone(),
            report,
        })
    }

    /// Report generator attributed to the configured user, when one is set
    fn report_generator(&self) -> HotswapResult<BugReportGenerator> {
        let mut generator = BugReportGenerator::from_registry(&self.registry)?;
        if let Some(user) = &self.config.user_id {
            generator = generator.with_user(user.clone());
        }
        Ok(generator)
    }
}

/// Per-run append bookkeeping: causation, correlation, lifecycle checking
struct RunRecorder<'a> {
    store: &'a Arc<dyn EventStore>,
    emitters: &'a [Arc<dyn EventEmitter>],
    ids: &'a Arc<dyn EventIdGenerator>,
    config: &'a PipelineConfig,
    aggregate_id: &'a str,
    correlation: uuid::Uuid,
    events: Vec<VersionedEvent>,
    state: SwapLifecycle,
}

impl RunRecorder<'_> {
    async fn append(
        &mut self,
        causation: Option<uuid::Uuid>,
        next_state: SwapLifecycle,
        payload: HotswapEvent,
    ) -> HotswapResult<VersionedEvent> {
        // First append of a run starts the attempt at Detected; later ones
        // must follow the lifecycle table.
        if !self.events.is_empty() {
            self.state = self
                .state
                .transition_to(next_state)
                .map_err(|err| HotswapError::Configuration(err.to_string()))?;
        }

        let timestamp = match &payload {
            HotswapEvent::ClassFileChanged(e) => e.detected_at,
            HotswapEvent::ClassMetadataExtracted(e) => e.extracted_at,
            HotswapEvent::BytecodeValidated(e) => e.validated_at,
            HotswapEvent::BytecodeRejected(e) => e.rejected_at,
            HotswapEvent::HotSwapRequested(e) => e.requested_at,
            HotswapEvent::ClassRedefinitionSucceeded(e) => e.completed_at,
            HotswapEvent::ClassRedefinitionFailed(e) => e.failed_at,
            HotswapEvent::InstancesUpdated(e) => e.completed_at,
            HotswapEvent::ClassFileDeleted(e) => e.detected_at,
        };

        let mut draft = EventDraft::new(
            FILEWATCH_AGGREGATE,
            self.aggregate_id,
            self.ids.next_id(),
            timestamp,
            payload,
        )
        .with_correlation(self.correlation);
        if let Some(causation) = causation {
            draft = draft.with_causation(causation);
        }
        if let Some(user) = &self.config.user_id {
            draft = draft.with_user(user.clone());
        }

        let event = record_event(
            self.store,
            self.emitters,
            draft,
            self.config.max_append_retries,
        )
        .await?;
        self.events.push(event.clone());
        Ok(event)
    }
}
