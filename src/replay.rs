// Copyright (c) 2025 - Hotswap Core Contributors
//! Bug reproduction engine
//!
//! Turns a captured [`BugReport`] back into a running scenario:
//!
//! - **given** - every captured event before the trigger is replayed into a
//!   fresh, empty store, rebuilding the state the bug occurred in
//! - **when** - the trigger (the last dispatchable change or deletion in
//!   the capture) is re-dispatched through the live pipeline
//! - **then** - the resulting events are exposed for assertion
//!
//! Two verification modes: [`reproduce_bug`](BugReproductionEngine::reproduce_bug)
//! asserts the defect still manifests (pre-fix), and
//! [`verify_fixed`](BugReproductionEngine::verify_fixed) asserts it no
//! longer does (post-fix regression gate).
//!
//! Determinism contract: with every capability in the registry bound to a
//! deterministic double, identical captures always yield byte-identical
//! resulting events. That is why the engine resolves everything it touches
//! through the registry and refuses to run against a non-empty store.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::bugreport::BugReport;
use crate::cleanup::CleanupOrchestrator;
use crate::domain::{FileChangeKind, FileChangeNotification};
use crate::errors::{HotswapError, HotswapResult};
use crate::event_store::EventStore;
use crate::events::{EventDraft, HotswapEvent, VersionedEvent};
use crate::pipeline::{DecisionPipeline, PipelineConfig};
use crate::registry::CapabilityRegistry;

/// What a replay produced
#[derive(Debug, Clone)]
pub struct ReplayResult {
    /// Events seeded into the store as "given" state
    pub given: Vec<VersionedEvent>,
    /// Events produced by re-dispatching the trigger ("then")
    pub resulting: Vec<VersionedEvent>,
}

impl ReplayResult {
    /// The terminal event of the replayed run
    pub fn terminal(&self) -> Option<&VersionedEvent> {
        self.resulting.last()
    }
}

/// Verdict of a verification replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayVerdict {
    /// The captured defect manifested again
    Reproduced,
    /// The captured defect no longer manifests
    Fixed,
}

/// Replays captured event sequences through the live pipeline
pub struct BugReproductionEngine {
    registry: Arc<CapabilityRegistry>,
    config: PipelineConfig,
}

impl BugReproductionEngine {
    /// Engine with default configuration
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self::with_config(registry, PipelineConfig::default())
    }

    /// Engine with explicit configuration
    pub fn with_config(registry: Arc<CapabilityRegistry>, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Replay a report's capture: seed "given", re-dispatch the trigger
    ///
    /// # Errors
    ///
    /// - [`HotswapError::Replay`](crate::HotswapError::Replay) when the
    ///   registered store is not empty, or the capture contains no
    ///   dispatchable trigger
    /// - any infrastructure error from seeding or re-dispatch
    #[instrument(skip(self, report), fields(report_id = %report.report_id))]
    pub async fn replay(&self, report: &BugReport) -> HotswapResult<ReplayResult> {
        let store = self.registry.resolve::<dyn EventStore>()?;
        if store.total_event_count().await? > 0 {
            return Err(HotswapError::Replay(
                "replay requires a fresh, empty event store".to_string(),
            ));
        }

        let events = &report.snapshot.events;
        let trigger_index = events
            .iter()
            .rposition(|event| dispatchable(&event.payload).is_some())
            .ok_or_else(|| {
                HotswapError::Replay(
                    "capture contains no dispatchable change or deletion".to_string(),
                )
            })?;

        // Given: rebuild the pre-trigger state with the captured ids and
        // timestamps. The store re-derives versions and links; a capture
        // that starts mid-stream replays from version 1 of the fresh store.
        let mut given = Vec::with_capacity(trigger_index);
        for event in &events[..trigger_index] {
            given.push(store.append(seed_draft(event)).await?);
        }

        // When: the trigger goes through the live pipeline, not the store.
        let notification = dispatchable(&events[trigger_index].payload)
            .ok_or_else(|| HotswapError::Replay("trigger vanished mid-replay".to_string()))?;

        let resulting = match notification.kind {
            FileChangeKind::Deleted => {
                let orchestrator = CleanupOrchestrator::with_config(
                    Arc::clone(&self.registry),
                    self.config.clone(),
                );
                vec![orchestrator.process_deletion(notification).await?.event]
            }
            _ => {
                let pipeline = DecisionPipeline::with_config(
                    Arc::clone(&self.registry),
                    self.config.clone(),
                );
                pipeline
                    .process_change(notification)
                    .await?
                    .events()
                    .to_vec()
            }
        };

        info!(
            given = given.len(),
            resulting = resulting.len(),
            "replay complete"
        );
        Ok(ReplayResult { given, resulting })
    }

    /// Pre-fix mode: does the captured defect still manifest?
    pub async fn reproduce_bug(&self, report: &BugReport) -> HotswapResult<ReplayVerdict> {
        self.verdict(report).await
    }

    /// Post-fix mode: has the captured defect stopped manifesting?
    ///
    /// Same replay, same comparison; the two entry points exist so a test
    /// reads as the assertion it makes.
    pub async fn verify_fixed(&self, report: &BugReport) -> HotswapResult<ReplayVerdict> {
        self.verdict(report).await
    }

    async fn verdict(&self, report: &BugReport) -> HotswapResult<ReplayVerdict> {
        let captured_failure = report
            .snapshot
            .events
            .iter()
            .rev()
            .find(|event| event.payload.is_terminal_failure())
            .ok_or_else(|| {
                HotswapError::Replay("capture contains no terminal failure to verify".to_string())
            })?;

        let result = self.replay(report).await?;
        let manifested = result.resulting.iter().any(|event| {
            event.payload.is_terminal_failure()
                && event.event_type_name() == captured_failure.event_type_name()
        });

        Ok(if manifested {
            ReplayVerdict::Reproduced
        } else {
            ReplayVerdict::Fixed
        })
    }
}

/// Reconstruct the pipeline input a captured event came from
fn dispatchable(payload: &HotswapEvent) -> Option<FileChangeNotification> {
    match payload {
        HotswapEvent::ClassFileChanged(e) => Some(FileChangeNotification {
            path: e.class_file.clone(),
            kind: FileChangeKind::Modified,
            observed_at: e.detected_at,
            file_size: e.file_size,
        }),
        HotswapEvent::ClassFileDeleted(e) => Some(FileChangeNotification {
            path: e.class_file.clone(),
            kind: FileChangeKind::Deleted,
            observed_at: e.detected_at,
            file_size: 0,
        }),
        _ => None,
    }
}

/// Draft that re-appends a captured event's facts
fn seed_draft(event: &VersionedEvent) -> EventDraft {
    EventDraft {
        aggregate_type: event.metadata.aggregate_type.clone(),
        aggregate_id: event.metadata.aggregate_id.clone(),
        expected_version: None,
        event_id: event.metadata.event_id,
        timestamp: event.metadata.timestamp,
        schema_version: event.metadata.schema_version,
        user_id: event.metadata.user_id.clone(),
        correlation_id: event.metadata.correlation_id,
        causation_id: event.metadata.causation_id,
        payload: event.payload.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bugreport::BugReportGenerator;
    use crate::domain::TypeFingerprint;
    use crate::event_store::InMemoryEventStore;
    use crate::pipeline::SwapOutcome;
    use crate::ports::mock::{
        FixedClock, FixedInstanceTracker, MockBytecodeAnalyzer, MockInstrumentation,
        ScriptedValidator, SequentialIdGenerator,
    };
    use crate::ports::{
        BytecodeAnalyzer, BytecodeValidator, Clock, EventIdGenerator, InstanceTracker,
        Instrumentation,
    };
    use chrono::{TimeDelta, TimeZone, Utc};
    use std::path::PathBuf;

    const CLASS_FILE: &str = "/build/OrderService.class";

    fn fingerprint() -> TypeFingerprint {
        TypeFingerprint {
            class_name: "OrderService".to_string(),
            superclass: None,
            interfaces: Vec::new(),
            declared_fields: vec!["repository".to_string()],
            declared_methods: vec!["placeOrder(Order)".to_string()],
        }
    }

    /// Registry wired entirely with deterministic doubles
    fn deterministic_registry(validator: ScriptedValidator) -> Arc<CapabilityRegistry> {
        let registry = Arc::new(CapabilityRegistry::new());
        registry
            .register::<dyn EventStore>(Arc::new(InMemoryEventStore::new()) as Arc<dyn EventStore>);
        registry.register::<dyn BytecodeAnalyzer>(Arc::new(
            MockBytecodeAnalyzer::new().with_fingerprint(CLASS_FILE, fingerprint()),
        ) as Arc<dyn BytecodeAnalyzer>);
        registry.register::<dyn BytecodeValidator>(Arc::new(validator) as Arc<dyn BytecodeValidator>);
        registry.register::<dyn Instrumentation>(
            Arc::new(MockInstrumentation::succeeding(2)) as Arc<dyn Instrumentation>
        );
        registry.register::<dyn InstanceTracker>(
            Arc::new(FixedInstanceTracker::new()) as Arc<dyn InstanceTracker>
        );
        registry.register::<dyn EventIdGenerator>(
            Arc::new(SequentialIdGenerator::new()) as Arc<dyn EventIdGenerator>
        );
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        registry.register::<dyn Clock>(
            Arc::new(FixedClock::stepping(base, TimeDelta::seconds(1))) as Arc<dyn Clock>
        );
        registry
    }

    fn change() -> FileChangeNotification {
        FileChangeNotification {
            path: PathBuf::from(CLASS_FILE),
            kind: FileChangeKind::Modified,
            observed_at: Utc.with_ymd_and_hms(2025, 6, 1, 11, 59, 0).unwrap(),
            file_size: 24,
        }
    }

    /// Capture a rejection by running a rejecting pipeline for real
    async fn captured_rejection() -> BugReport {
        let registry = deterministic_registry(ScriptedValidator::rejecting(
            "removed public method placeOrder(Order)",
        ));
        let pipeline = DecisionPipeline::new(Arc::clone(&registry));
        match pipeline.process_change(change()).await.expect("outcome") {
            SwapOutcome::Rejected { report, .. } => report,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reproduce_bug_manifests_the_rejection_again() {
        let report = captured_rejection().await;

        // Same broken validator, fresh store: the defect must reproduce.
        let registry = deterministic_registry(ScriptedValidator::rejecting(
            "removed public method placeOrder(Order)",
        ));
        let engine = BugReproductionEngine::new(registry);
        assert_eq!(
            engine.reproduce_bug(&report).await.expect("verdict"),
            ReplayVerdict::Reproduced
        );
    }

    #[tokio::test]
    async fn verify_fixed_passes_once_the_validator_accepts() {
        let report = captured_rejection().await;

        // Corrected validator: the same capture must now validate.
        let registry = deterministic_registry(ScriptedValidator::accepting());
        let engine = BugReproductionEngine::new(Arc::clone(&registry));
        assert_eq!(
            engine.verify_fixed(&report).await.expect("verdict"),
            ReplayVerdict::Fixed
        );

        let store = registry.resolve::<dyn EventStore>().unwrap();
        let validated = store.events_by_type("BytecodeValidated").await.unwrap();
        assert_eq!(validated.len(), 1);
        assert!(store
            .events_by_type("BytecodeRejected")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn replay_is_byte_identical_across_runs() {
        let report = captured_rejection().await;

        let mut serialized_runs = Vec::new();
        for _ in 0..2 {
            let registry = deterministic_registry(ScriptedValidator::rejecting(
                "removed public method placeOrder(Order)",
            ));
            let engine = BugReproductionEngine::new(registry);
            let result = engine.replay(&report).await.expect("replay");
            serialized_runs
                .push(serde_json::to_vec(&result.resulting).expect("serialize resulting events"));
        }
        assert_eq!(serialized_runs[0], serialized_runs[1]);
    }

    #[tokio::test]
    async fn replay_refuses_a_dirty_store() {
        let report = captured_rejection().await;

        let registry = deterministic_registry(ScriptedValidator::accepting());
        // Dirty the store before replaying.
        let pipeline = DecisionPipeline::new(Arc::clone(&registry));
        pipeline.process_change(change()).await.expect("dirty run");

        let engine = BugReproductionEngine::new(registry);
        let err = engine.replay(&report).await.expect_err("store is dirty");
        assert!(matches!(err, HotswapError::Replay(_)));
    }

    #[tokio::test]
    async fn capture_without_failure_cannot_be_verified() {
        let registry = deterministic_registry(ScriptedValidator::accepting());
        let pipeline = DecisionPipeline::new(Arc::clone(&registry));
        let outcome = pipeline.process_change(change()).await.expect("applied");
        assert!(outcome.is_applied());

        let generator = BugReportGenerator::from_registry(&registry).expect("generator");
        let report = generator.generate("not actually a failure", outcome.events().to_vec());

        let verify_registry = deterministic_registry(ScriptedValidator::accepting());
        let engine = BugReproductionEngine::new(verify_registry);
        let err = engine
            .verify_fixed(&report)
            .await
            .expect_err("nothing to verify");
        assert!(matches!(err, HotswapError::Replay(_)));
    }
}
