// Copyright (c) 2025 - Hotswap Core Contributors
//! Test fixtures for hotswap-core
//!
//! Provides deterministic test data and fully-scripted capability
//! registries. All UUIDs and timestamps are fixed constants so every test
//! run sees identical events.
//!
//! # Design Principles
//! - All test data is deterministic (no `Uuid::now_v7()` or `Utc::now()`)
//! - Fixtures are the ONLY place that wires registries for integration tests
//! - Tests use fixtures, never ad-hoc wiring

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Once};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use uuid::Uuid;

use hotswap_core::domain::{FileChangeKind, FileChangeNotification, TypeFingerprint};
use hotswap_core::event_store::{EventStore, InMemoryEventStore};
use hotswap_core::ports::mock::{
    CollectingEmitter, FixedClock, FixedInstanceTracker, MockBytecodeAnalyzer,
    MockInstrumentation, ScriptedValidator, SequentialIdGenerator,
};
use hotswap_core::ports::{
    BytecodeAnalyzer, BytecodeValidator, Clock, EventEmitter, EventIdGenerator, InstanceTracker,
    Instrumentation,
};
use hotswap_core::registry::CapabilityRegistry;

static TRACING: Once = Once::new();

/// Install the test tracing subscriber once per process
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Watched class files used across scenarios
pub const ORDER_SERVICE_CLASS: &str = "/build/classes/OrderService.class";
pub const PAYMENT_SERVICE_CLASS: &str = "/build/classes/PaymentService.class";

// Fixed test timestamp (2025-06-01T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2025-06-01T12:00:00Z";

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Parse a fixed UUID from a constant string
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

/// Fingerprint for the OrderService scenarios
pub fn order_service_fingerprint() -> TypeFingerprint {
    TypeFingerprint {
        class_name: "OrderService".to_string(),
        superclass: Some("BaseService".to_string()),
        interfaces: vec!["Auditable".to_string()],
        declared_fields: vec!["repository".to_string(), "clock".to_string()],
        declared_methods: vec!["placeOrder(Order)".to_string(), "cancel(OrderId)".to_string()],
    }
}

/// Fingerprint for the PaymentService scenarios
pub fn payment_service_fingerprint() -> TypeFingerprint {
    TypeFingerprint {
        class_name: "PaymentService".to_string(),
        superclass: None,
        interfaces: vec!["Auditable".to_string()],
        declared_fields: vec!["gateway".to_string()],
        declared_methods: vec!["charge(Amount)".to_string()],
    }
}

/// A modification notification at the fixed timestamp
pub fn change_notification(path: &str, file_size: u64) -> FileChangeNotification {
    FileChangeNotification {
        path: PathBuf::from(path),
        kind: FileChangeKind::Modified,
        observed_at: fixed_timestamp(),
        file_size,
    }
}

/// A deletion notification at the fixed timestamp
pub fn deletion_notification(path: &str) -> FileChangeNotification {
    FileChangeNotification {
        path: PathBuf::from(path),
        kind: FileChangeKind::Deleted,
        observed_at: fixed_timestamp(),
        file_size: 0,
    }
}

/// A fully-scripted registry plus handles tests assert through
pub struct TestHarness {
    pub registry: Arc<CapabilityRegistry>,
    pub store: Arc<dyn EventStore>,
    pub emitter: Arc<CollectingEmitter>,
}

/// Wire a registry entirely from deterministic doubles
///
/// The analyzer knows both fixture class files; tracker, ids and clock are
/// fixed. Validator and instrumentation vary per scenario, so the caller
/// supplies them.
pub fn deterministic_harness(
    validator: ScriptedValidator,
    instrumentation: MockInstrumentation,
) -> TestHarness {
    harness_with_tracker(validator, instrumentation, FixedInstanceTracker::new())
}

/// Same as [`deterministic_harness`], with a scripted instance tracker
pub fn harness_with_tracker(
    validator: ScriptedValidator,
    instrumentation: MockInstrumentation,
    tracker: FixedInstanceTracker,
) -> TestHarness {
    harness_with_store(
        Arc::new(InMemoryEventStore::new()),
        validator,
        instrumentation,
        tracker,
    )
}

/// Same as [`deterministic_harness`], against a caller-supplied store
pub fn harness_with_store(
    store: Arc<dyn EventStore>,
    validator: ScriptedValidator,
    instrumentation: MockInstrumentation,
    tracker: FixedInstanceTracker,
) -> TestHarness {
    init_tracing();

    let registry = Arc::new(CapabilityRegistry::new());
    registry.register::<dyn EventStore>(Arc::clone(&store));

    registry.register::<dyn BytecodeAnalyzer>(Arc::new(
        MockBytecodeAnalyzer::new()
            .with_fingerprint(ORDER_SERVICE_CLASS, order_service_fingerprint())
            .with_fingerprint(PAYMENT_SERVICE_CLASS, payment_service_fingerprint()),
    ) as Arc<dyn BytecodeAnalyzer>);
    registry.register::<dyn BytecodeValidator>(Arc::new(validator) as Arc<dyn BytecodeValidator>);
    registry
        .register::<dyn Instrumentation>(Arc::new(instrumentation) as Arc<dyn Instrumentation>);
    registry.register::<dyn InstanceTracker>(Arc::new(tracker) as Arc<dyn InstanceTracker>);
    registry.register::<dyn EventIdGenerator>(
        Arc::new(SequentialIdGenerator::new()) as Arc<dyn EventIdGenerator>
    );
    registry.register::<dyn Clock>(Arc::new(FixedClock::stepping(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        TimeDelta::seconds(1),
    )) as Arc<dyn Clock>);

    let emitter = Arc::new(CollectingEmitter::new());
    registry.register::<dyn EventEmitter>(Arc::clone(&emitter) as Arc<dyn EventEmitter>);

    TestHarness {
        registry,
        store,
        emitter,
    }
}
