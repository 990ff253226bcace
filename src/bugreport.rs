// Copyright (c) 2025 - Hotswap Core Contributors
//! Event-sourced bug reports
//!
//! A failure is not a stack trace here: it is the ordered causal chain of
//! events that led to it, captured as an [`EventSnapshot`], classified, and
//! wrapped in a [`BugReport`] the reproduction engine can replay verbatim.
//!
//! Reports are generated automatically whenever the pipeline records a
//! terminal failure, so every human-visible defect arrives with a
//! ready-to-run reproduction scenario attached.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::HotswapResult;
use crate::events::{HotswapEvent, VersionedEvent};
use crate::ports::{Clock, EventIdGenerator};
use crate::registry::CapabilityRegistry;

/// How urgently the defect needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugSeverity {
    /// Informational; the chain records no failure
    Info,
    /// Cosmetic or fully recoverable
    Low,
    /// Degrades one swap attempt
    Medium,
    /// A swap path is broken
    High,
    /// The pipeline cannot make progress
    Critical,
}

/// Which part of the system the defect lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugCategory {
    /// The change itself is not hot-swappable
    BytecodeIncompatibility,
    /// The runtime refused a redefinition the validator accepted
    RuntimeRejection,
    /// Store, watcher or emitter infrastructure failed
    InfrastructureFailure,
    /// A stale-version append race
    ConcurrencyConflict,
    /// Nothing matched; needs triage
    Unknown,
}

/// Ordered subsequence of events captured at failure time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Snapshot identity
    pub snapshot_id: Uuid,

    /// When the snapshot was captured
    pub captured_at: DateTime<Utc>,

    /// What the snapshot shows, in one line
    pub description: String,

    /// Ambient process context at capture time (OS, architecture, versions)
    ///
    /// Ordered map so serialized snapshots compare stably.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// User the capturing run was attributed to, if known
    #[serde(default)]
    pub user_id: Option<String>,

    /// The causal chain, oldest first; the last event is the trigger
    pub events: Vec<VersionedEvent>,
}

impl EventSnapshot {
    /// The final (triggering) event of the chain
    pub fn trigger(&self) -> Option<&VersionedEvent> {
        self.events.last()
    }

    /// The "given" prefix: every event but the trigger
    pub fn given(&self) -> &[VersionedEvent] {
        match self.events.len() {
            0 => &[],
            n => &self.events[..n - 1],
        }
    }

    /// Whether the captured chain is gap-free within each stream
    ///
    /// A chain with missing links still replays, but the reproduction is no
    /// longer guaranteed faithful; the score reflects that.
    pub fn is_gap_free(&self) -> bool {
        use std::collections::HashMap;
        let mut last_seen: HashMap<(&str, &str), u64> = HashMap::new();
        for event in &self.events {
            let key = (
                event.metadata.aggregate_type.as_str(),
                event.metadata.aggregate_id.as_str(),
            );
            if let Some(previous) = last_seen.get(&key) {
                if event.metadata.aggregate_version != previous + 1 {
                    return false;
                }
            }
            last_seen.insert(key, event.metadata.aggregate_version);
        }
        true
    }
}

/// A classified, replayable defect record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    /// Report identity
    pub report_id: Uuid,

    /// One-line summary
    pub title: String,

    /// Urgency classification
    pub severity: BugSeverity,

    /// Subsystem classification
    pub category: BugCategory,

    /// 0.0..=1.0 confidence that replaying the snapshot reproduces the bug
    pub reproducibility: f64,

    /// The captured causal chain
    pub snapshot: EventSnapshot,

    /// When the report was generated
    pub created_at: DateTime<Utc>,
}

impl BugReport {
    /// Serialize the report for persistence
    pub fn to_json(&self) -> HotswapResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild a report from its persisted form
    pub fn from_json(json: &str) -> HotswapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the report for humans
    pub fn to_markdown(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "# Bug Report: {}", self.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "- **Id**: {}", self.report_id);
        let _ = writeln!(out, "- **Severity**: {:?}", self.severity);
        let _ = writeln!(out, "- **Category**: {:?}", self.category);
        let _ = writeln!(out, "- **Reproducibility**: {:.2}", self.reproducibility);
        let _ = writeln!(out, "- **Created**: {}", self.created_at.to_rfc3339());
        if let Some(user) = &self.snapshot.user_id {
            let _ = writeln!(out, "- **User**: {user}");
        }
        let _ = writeln!(out);
        if !self.snapshot.environment.is_empty() {
            let _ = writeln!(out, "## Environment");
            let _ = writeln!(out);
            for (key, value) in &self.snapshot.environment {
                let _ = writeln!(out, "- `{key}`: {value}");
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "## Causal chain ({} events)", self.snapshot.events.len());
        let _ = writeln!(out);
        for event in &self.snapshot.events {
            let _ = writeln!(
                out,
                "{}. `{}` v{} on `{}` at {}",
                event.metadata.aggregate_version,
                event.event_type_name(),
                event.metadata.aggregate_version,
                event.metadata.aggregate_id,
                event.metadata.timestamp.to_rfc3339(),
            );
        }
        out
    }
}

/// Classify severity from the triggering event
fn classify_severity(trigger: &HotswapEvent) -> BugSeverity {
    match trigger {
        HotswapEvent::BytecodeRejected(_) => BugSeverity::Medium,
        HotswapEvent::ClassRedefinitionFailed(_) => BugSeverity::High,
        HotswapEvent::ClassFileDeleted(deleted) if deleted.live_instances.is_none() => {
            BugSeverity::High
        }
        HotswapEvent::ClassFileDeleted(_) => BugSeverity::Low,
        _ => BugSeverity::Info,
    }
}

/// Classify category from the triggering event
fn classify_category(trigger: &HotswapEvent) -> BugCategory {
    match trigger {
        HotswapEvent::BytecodeRejected(_) => BugCategory::BytecodeIncompatibility,
        HotswapEvent::ClassRedefinitionFailed(_) => BugCategory::RuntimeRejection,
        _ => BugCategory::Unknown,
    }
}

/// Generates bug reports from committed event chains
///
/// Identity and time come from the registry-resolved capabilities, so
/// report generation itself is deterministic under replay. The ambient
/// environment captured into each snapshot defaults to the host's stable
/// facts (OS, architecture, core version); callers layer on their own
/// entries and the acting user.
pub struct BugReportGenerator {
    ids: Arc<dyn EventIdGenerator>,
    clock: Arc<dyn Clock>,
    environment: BTreeMap<String, String>,
    user: Option<String>,
}

impl BugReportGenerator {
    /// Build a generator from explicit capabilities
    pub fn new(ids: Arc<dyn EventIdGenerator>, clock: Arc<dyn Clock>) -> Self {
        let mut environment = BTreeMap::new();
        environment.insert("os".to_string(), std::env::consts::OS.to_string());
        environment.insert("arch".to_string(), std::env::consts::ARCH.to_string());
        environment.insert(
            "core_version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self {
            ids,
            clock,
            environment,
            user: None,
        }
    }

    /// Add or override one environment entry captured into snapshots
    pub fn with_env_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Attribute generated snapshots to `user`
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Build a generator from registry-resolved capabilities
    ///
    /// # Errors
    ///
    /// [`HotswapError::MissingCapability`](crate::HotswapError::MissingCapability)
    /// when the id generator or clock is not registered.
    pub fn from_registry(registry: &CapabilityRegistry) -> HotswapResult<Self> {
        Ok(Self::new(
            registry.resolve::<dyn EventIdGenerator>()?,
            registry.resolve::<dyn Clock>()?,
        ))
    }

    /// Capture a chain ending in a failure and classify it
    ///
    /// The last element of `chain` must be the failure event; classification
    /// reads it. A gap-free chain scores full reproducibility.
    pub fn generate(&self, title: impl Into<String>, chain: Vec<VersionedEvent>) -> BugReport {
        let now = self.clock.now();
        let (severity, category) = match chain.last() {
            Some(trigger) => (
                classify_severity(&trigger.payload),
                classify_category(&trigger.payload),
            ),
            None => (BugSeverity::Info, BugCategory::Unknown),
        };

        let snapshot = EventSnapshot {
            snapshot_id: self.ids.next_id(),
            captured_at: now,
            description: title.into(),
            environment: self.environment.clone(),
            user_id: self.user.clone(),
            events: chain,
        };
        let reproducibility = if snapshot.events.is_empty() {
            0.0
        } else if snapshot.is_gap_free() {
            1.0
        } else {
            0.5
        };

        BugReport {
            report_id: self.ids.next_id(),
            title: snapshot.description.clone(),
            severity,
            category,
            reproducibility,
            snapshot,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::hotswap::{BytecodeRejected, ClassFileChanged, ClassRedefinitionFailed};
    use crate::events::{EventMetadata, FILEWATCH_AGGREGATE};
    use crate::ports::mock::{FixedClock, SequentialIdGenerator};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn event_at(version: u64, payload: HotswapEvent) -> VersionedEvent {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        VersionedEvent {
            metadata: EventMetadata {
                event_id: Uuid::from_u128(version as u128),
                aggregate_type: FILEWATCH_AGGREGATE.to_string(),
                aggregate_id: "/build/OrderService.class".to_string(),
                aggregate_version: version,
                timestamp: at,
                previous_event_id: (version > 1).then(|| Uuid::from_u128(version as u128 - 1)),
                schema_version: 1,
                user_id: None,
                correlation_id: None,
                causation_id: None,
                stream_position: Some(version),
            },
            payload,
        }
    }

    fn rejection_chain() -> Vec<VersionedEvent> {
        vec![
            event_at(
                1,
                HotswapEvent::ClassFileChanged(ClassFileChanged {
                    class_file: PathBuf::from("/build/OrderService.class"),
                    class_name: "OrderService".to_string(),
                    file_size: 100,
                    detected_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                }),
            ),
            event_at(
                2,
                HotswapEvent::BytecodeRejected(BytecodeRejected::new(
                    PathBuf::from("/build/OrderService.class"),
                    "OrderService",
                    "removed public method foo()",
                    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap(),
                )),
            ),
        ]
    }

    fn generator() -> BugReportGenerator {
        BugReportGenerator::new(
            Arc::new(SequentialIdGenerator::starting_at(100)),
            Arc::new(FixedClock::frozen(
                Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap(),
            )),
        )
    }

    #[test]
    fn rejection_is_classified_as_bytecode_incompatibility() {
        let report = generator().generate("validator rejected change", rejection_chain());
        assert_eq!(report.category, BugCategory::BytecodeIncompatibility);
        assert_eq!(report.severity, BugSeverity::Medium);
        assert_eq!(report.reproducibility, 1.0);
        assert_eq!(report.snapshot.given().len(), 1);
        assert_eq!(
            report.snapshot.trigger().unwrap().event_type_name(),
            "BytecodeRejected"
        );
    }

    #[test]
    fn runtime_refusal_outranks_a_rejection() {
        let chain = vec![event_at(
            1,
            HotswapEvent::ClassRedefinitionFailed(ClassRedefinitionFailed {
                class_name: "OrderService".to_string(),
                class_file: PathBuf::from("/build/OrderService.class"),
                failure_reason: "schema change not supported".to_string(),
                jvm_error_code: Some("UNSUPPORTED_REDEFINITION".to_string()),
                failed_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 2).unwrap(),
            }),
        )];
        let report = generator().generate("runtime refused", chain);
        assert_eq!(report.category, BugCategory::RuntimeRejection);
        assert_eq!(report.severity, BugSeverity::High);
    }

    #[test]
    fn gapped_chain_halves_reproducibility() {
        let mut chain = rejection_chain();
        chain[1].metadata.aggregate_version = 5;
        let report = generator().generate("gapped capture", chain);
        assert_eq!(report.reproducibility, 0.5);
    }

    #[test]
    fn snapshot_carries_environment_and_user() {
        let report = generator()
            .with_env_entry("jvm", "21.0.2")
            .with_user("dev@example.com")
            .generate("validator rejected change", rejection_chain());

        assert_eq!(report.snapshot.user_id.as_deref(), Some("dev@example.com"));
        assert_eq!(
            report.snapshot.environment.get("jvm").map(String::as_str),
            Some("21.0.2")
        );
        // Host facts are captured by default.
        assert!(report.snapshot.environment.contains_key("os"));
        assert!(report.snapshot.environment.contains_key("arch"));

        let md = report.to_markdown();
        assert!(md.contains("- **User**: dev@example.com"));
        assert!(md.contains("- `jvm`: 21.0.2"));
    }

    #[test]
    fn chain_without_a_failure_is_informational() {
        let chain = vec![event_at(
            1,
            HotswapEvent::ClassFileChanged(ClassFileChanged {
                class_file: PathBuf::from("/build/OrderService.class"),
                class_name: "OrderService".to_string(),
                file_size: 100,
                detected_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            }),
        )];
        let report = generator().generate("nothing failed", chain);
        assert_eq!(report.severity, BugSeverity::Info);
        assert!(BugSeverity::Info < BugSeverity::Low);
    }

    #[test]
    fn report_roundtrips_through_json() {
        let report = generator().generate("validator rejected change", rejection_chain());
        let json = report.to_json().expect("serialize");
        let back = BugReport::from_json(&json).expect("deserialize");
        assert_eq!(back, report);
    }

    #[test]
    fn markdown_lists_the_chain() {
        let report = generator().generate("validator rejected change", rejection_chain());
        let md = report.to_markdown();
        assert!(md.starts_with("# Bug Report: validator rejected change"));
        assert!(md.contains("`BytecodeRejected` v2"));
    }
}
