// Copyright (c) 2025 - Hotswap Core Contributors
//! Cleanup orchestrator
//!
//! The deletion branch of the pipeline. Its contract is strictly to
//! classify, select a strategy, and record both as a `ClassFileDeleted`
//! event - never to perform teardown. Loader coordination and
//! managed-lifecycle teardown belong to external collaborators reading the
//! recorded decision.
//!
//! Classification is a pure function of the live-instance count and the
//! dependent-type set (see
//! [`DeletionImpact::classify`](crate::domain::DeletionImpact::classify)),
//! so the same deletion always yields the same recorded plan.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::{
    class_name_from_path, CleanupStrategy, DeletionImpact, FileChangeKind, FileChangeNotification,
};
use crate::errors::{HotswapError, HotswapResult};
use crate::event_store::EventStore;
use crate::events::hotswap::ClassFileDeleted;
use crate::events::{EventDraft, HotswapEvent, VersionedEvent, FILEWATCH_AGGREGATE};
use crate::pipeline::{record_event, PipelineConfig};
use crate::ports::{EventEmitter, EventIdGenerator, InstanceTracker};
use crate::registry::CapabilityRegistry;

/// A recorded cleanup plan
#[derive(Debug, Clone)]
pub struct CleanupDecision {
    /// The committed `ClassFileDeleted` event
    pub event: VersionedEvent,
    /// Assessed disruption
    pub impact: DeletionImpact,
    /// Deterministically chosen strategy
    pub strategy: CleanupStrategy,
}

/// Classifies deletions and records cleanup plans
pub struct CleanupOrchestrator {
    registry: Arc<CapabilityRegistry>,
    config: PipelineConfig,
}

impl CleanupOrchestrator {
    /// Orchestrator with default configuration
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self::with_config(registry, PipelineConfig::default())
    }

    /// Orchestrator with explicit configuration
    pub fn with_config(registry: Arc<CapabilityRegistry>, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Classify one deletion and append the decision to its stream
    ///
    /// A deletion is *expected* when the stream already has events: the
    /// file was being watched, so its disappearance is part of a known
    /// lifecycle rather than a surprise.
    ///
    /// # Errors
    ///
    /// Infrastructure and contract errors only; the classification itself
    /// cannot fail.
    #[instrument(skip(self, notification), fields(path = %notification.path.display()))]
    pub async fn process_deletion(
        &self,
        notification: FileChangeNotification,
    ) -> HotswapResult<CleanupDecision> {
        if notification.kind != FileChangeKind::Deleted {
            return Err(HotswapError::Configuration(format!(
                "cleanup orchestrator only handles deletions, got {:?}",
                notification.kind
            )));
        }

        let store = self.registry.resolve::<dyn EventStore>()?;
        let tracker = self.registry.resolve::<dyn InstanceTracker>()?;
        let ids = self.registry.resolve::<dyn EventIdGenerator>()?;
        let emitters = self.registry.resolve_all::<dyn EventEmitter>();

        let aggregate_id = notification.path.to_string_lossy().into_owned();
        let class_name = class_name_from_path(&notification.path);

        let expected_deletion = store
            .aggregate_exists(FILEWATCH_AGGREGATE, &aggregate_id)
            .await?;
        let live_instances = tracker.live_instance_count(&class_name);
        let dependent_types = tracker.dependent_types(&class_name);

        let impact = DeletionImpact::classify(live_instances, dependent_types.len());
        let strategy = impact.recommended_strategy();

        let mut draft = EventDraft::new(
            FILEWATCH_AGGREGATE,
            &aggregate_id,
            ids.next_id(),
            notification.observed_at,
            HotswapEvent::ClassFileDeleted(ClassFileDeleted {
                class_file: notification.path.clone(),
                class_name: class_name.clone(),
                detected_at: notification.observed_at,
                expected_deletion,
                live_instances,
                dependent_types,
                impact,
                strategy,
            }),
        )
        .with_correlation(ids.next_id());
        if let Some(user) = &self.config.user_id {
            draft = draft.with_user(user.clone());
        }

        let event = record_event(&store, &emitters, draft, self.config.max_append_retries).await?;

        info!(
            class_name = %class_name,
            ?impact,
            ?strategy,
            expected_deletion,
            "cleanup plan recorded"
        );

        Ok(CleanupDecision {
            event,
            impact,
            strategy,
        })
    }
}
