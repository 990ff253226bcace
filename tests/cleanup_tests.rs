// Copyright (c) 2025 - Hotswap Core Contributors
//! Cleanup orchestrator integration tests

mod fixtures;

use pretty_assertions::assert_eq;

use hotswap_core::cleanup::CleanupOrchestrator;
use hotswap_core::domain::{CleanupStrategy, DeletionImpact};
use hotswap_core::events::{HotswapEvent, FILEWATCH_AGGREGATE};
use hotswap_core::pipeline::DecisionPipeline;
use hotswap_core::ports::mock::{FixedInstanceTracker, MockInstrumentation, ScriptedValidator};

use fixtures::{
    change_notification, deletion_notification, harness_with_tracker, ORDER_SERVICE_CLASS,
};

#[tokio::test]
async fn twelve_instances_and_three_dependents_is_high_and_aggressive() {
    let tracker = FixedInstanceTracker::new()
        .with_instances("OrderService", Some(12))
        .with_dependents(
            "OrderService",
            vec![
                "OrderController".to_string(),
                "OrderRepository".to_string(),
                "OrderAuditor".to_string(),
            ],
        );
    let h = harness_with_tracker(
        ScriptedValidator::accepting(),
        MockInstrumentation::succeeding(0),
        tracker,
    );
    let orchestrator = CleanupOrchestrator::new(h.registry.clone());

    let decision = orchestrator
        .process_deletion(deletion_notification(ORDER_SERVICE_CLASS))
        .await
        .expect("decision");

    assert_eq!(decision.impact, DeletionImpact::High);
    assert_eq!(decision.strategy, CleanupStrategy::AggressiveImmediate);
}

#[tokio::test]
async fn deletion_after_swaps_continues_the_stream_and_is_expected() {
    let tracker = FixedInstanceTracker::new().with_instances("OrderService", Some(2));
    let h = harness_with_tracker(
        ScriptedValidator::accepting(),
        MockInstrumentation::succeeding(2),
        tracker,
    );

    // Watch history first: one full applied swap.
    let pipeline = DecisionPipeline::new(h.registry.clone());
    pipeline
        .process_change(change_notification(ORDER_SERVICE_CLASS, 100))
        .await
        .expect("swap");

    let orchestrator = CleanupOrchestrator::new(h.registry.clone());
    let decision = orchestrator
        .process_deletion(deletion_notification(ORDER_SERVICE_CLASS))
        .await
        .expect("decision");

    assert_eq!(decision.event.metadata.aggregate_version, 7);
    match &decision.event.payload {
        HotswapEvent::ClassFileDeleted(e) => {
            assert!(e.expected_deletion);
            assert_eq!(e.live_instances, Some(2));
            assert_eq!(e.impact, DeletionImpact::Medium);
            assert_eq!(e.strategy, CleanupStrategy::GracefulDeferred);
        }
        other => panic!("expected ClassFileDeleted, got {other:?}"),
    }

    // The deletion chains onto the swap history like any other event.
    let stream = h
        .store
        .stream_for(FILEWATCH_AGGREGATE, ORDER_SERVICE_CLASS)
        .await
        .expect("stream");
    assert_eq!(
        stream[6].metadata.previous_event_id,
        Some(stream[5].metadata.event_id)
    );
}

#[tokio::test]
async fn undeterminable_live_count_degrades_to_aggressive_cleanup() {
    let tracker = FixedInstanceTracker::new().with_instances("OrderService", None);
    let h = harness_with_tracker(
        ScriptedValidator::accepting(),
        MockInstrumentation::succeeding(0),
        tracker,
    );
    let orchestrator = CleanupOrchestrator::new(h.registry.clone());

    let decision = orchestrator
        .process_deletion(deletion_notification(ORDER_SERVICE_CLASS))
        .await
        .expect("decision");

    assert!(decision.impact >= DeletionImpact::High);
    assert_eq!(decision.strategy, CleanupStrategy::AggressiveImmediate);
    match &decision.event.payload {
        HotswapEvent::ClassFileDeleted(e) => assert_eq!(e.live_instances, None),
        other => panic!("expected ClassFileDeleted, got {other:?}"),
    }
}

#[tokio::test]
async fn recorded_plan_is_published_not_executed() {
    let h = harness_with_tracker(
        ScriptedValidator::accepting(),
        MockInstrumentation::succeeding(0),
        FixedInstanceTracker::new(),
    );
    let orchestrator = CleanupOrchestrator::new(h.registry.clone());

    orchestrator
        .process_deletion(deletion_notification(ORDER_SERVICE_CLASS))
        .await
        .expect("decision");

    // The orchestrator records and publishes; it never calls the runtime.
    let emitted = h.emitter.emitted();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].event_type_name(), "ClassFileDeleted");
}
