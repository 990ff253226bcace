// Copyright (c) 2025 - Hotswap Core Contributors
//! Deterministic port doubles
//!
//! Every double here is fully scripted: same inputs, same outputs, every
//! run. The reproduction engine registers these in place of the production
//! adapters so a replayed scenario is byte-identical to the captured one.
//!
//! Shipped in the library (not `#[cfg(test)]`) because bug reproduction is a
//! production feature, not only a test concern.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::domain::{FileChangeNotification, TypeFingerprint};
use crate::errors::HotswapResult;
use crate::events::VersionedEvent;
use crate::ports::{
    AnalyzerError, BytecodeAnalyzer, BytecodeValidator, Clock, EventEmitter, EventIdGenerator,
    FileWatcher, InstanceTracker, Instrumentation, RedefinitionOutcome, ValidationVerdict,
};

/// Id generator that counts up from a fixed seed
///
/// Ids come out as `00000000-0000-0000-0000-0000000000NN`, stable across
/// runs and easy to eyeball in failing assertions.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Start counting at 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first.saturating_sub(1)),
        }
    }
}

impl EventIdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Uuid::from_u128(n as u128)
    }
}

/// Clock that starts at a fixed instant and advances a fixed step per call
#[derive(Debug)]
pub struct FixedClock {
    base: DateTime<Utc>,
    step: TimeDelta,
    ticks: AtomicU64,
}

impl FixedClock {
    /// Clock frozen at `base` (every call returns the same instant)
    pub fn frozen(base: DateTime<Utc>) -> Self {
        Self::stepping(base, TimeDelta::zero())
    }

    /// Clock starting at `base`, advancing `step` on every call
    pub fn stepping(base: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            base,
            step,
            ticks: AtomicU64::new(0),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        // Saturate rather than truncate; a tick count past i32::MAX must
        // not wrap the clock backwards.
        self.base + self.step * i32::try_from(tick).unwrap_or(i32::MAX)
    }
}

/// Analyzer scripted per class-file path
///
/// Paths with a scripted fingerprint also get deterministic scripted
/// bytes, so replays never touch the real file system.
#[derive(Debug, Default)]
pub struct MockBytecodeAnalyzer {
    scripts: HashMap<PathBuf, Result<TypeFingerprint, AnalyzerError>>,
    bytecode: HashMap<PathBuf, Vec<u8>>,
}

impl MockBytecodeAnalyzer {
    /// Analyzer with no scripts; every path is reported unreadable
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful fingerprint extraction for `path`
    pub fn with_fingerprint(mut self, path: impl Into<PathBuf>, fp: TypeFingerprint) -> Self {
        self.scripts.insert(path.into(), Ok(fp));
        self
    }

    /// Script an analyzer failure for `path`
    pub fn with_failure(mut self, path: impl Into<PathBuf>, err: AnalyzerError) -> Self {
        self.scripts.insert(path.into(), Err(err));
        self
    }

    /// Script the exact bytes `load_bytecode` returns for `path`
    pub fn with_bytecode(mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        self.bytecode.insert(path.into(), bytes);
        self
    }
}

#[async_trait]
impl BytecodeAnalyzer for MockBytecodeAnalyzer {
    async fn extract_fingerprint(
        &self,
        class_file: &Path,
    ) -> Result<TypeFingerprint, AnalyzerError> {
        match self.scripts.get(class_file) {
            Some(scripted) => scripted.clone(),
            None => Err(AnalyzerError::Unreadable {
                path: class_file.to_path_buf(),
                detail: "no scripted fingerprint".to_string(),
            }),
        }
    }

    async fn load_bytecode(&self, class_file: &Path) -> Result<Vec<u8>, AnalyzerError> {
        if let Some(bytes) = self.bytecode.get(class_file) {
            return Ok(bytes.clone());
        }
        match self.scripts.get(class_file) {
            Some(Ok(_)) => Ok(b"\xca\xfe\xba\xbe scripted bytecode".to_vec()),
            _ => Err(AnalyzerError::Unreadable {
                path: class_file.to_path_buf(),
                detail: "no scripted bytecode".to_string(),
            }),
        }
    }
}

/// Validator scripted per class name, with a default verdict
#[derive(Debug)]
pub struct ScriptedValidator {
    default: ValidationVerdict,
    per_class: HashMap<String, ValidationVerdict>,
}

impl ScriptedValidator {
    /// Validator that accepts everything not scripted otherwise
    pub fn accepting() -> Self {
        Self {
            default: ValidationVerdict::Accepted,
            per_class: HashMap::new(),
        }
    }

    /// Validator that rejects everything with one reason
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            default: ValidationVerdict::Rejected {
                reason: reason.into(),
            },
            per_class: HashMap::new(),
        }
    }

    /// Override the verdict for one class name
    pub fn with_verdict(mut self, class_name: impl Into<String>, verdict: ValidationVerdict) -> Self {
        self.per_class.insert(class_name.into(), verdict);
        self
    }
}

impl BytecodeValidator for ScriptedValidator {
    fn validate(
        &self,
        _previous: Option<&TypeFingerprint>,
        updated: &TypeFingerprint,
    ) -> ValidationVerdict {
        self.per_class
            .get(&updated.class_name)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Instrumentation scripted per class name, recording every call
#[derive(Debug)]
pub struct MockInstrumentation {
    default: RedefinitionOutcome,
    per_class: HashMap<String, RedefinitionOutcome>,
    calls: Mutex<Vec<String>>,
}

impl MockInstrumentation {
    /// Instrumentation that redefines everything successfully
    pub fn succeeding(affected_instances: usize) -> Self {
        Self {
            default: RedefinitionOutcome::Redefined {
                affected_instances,
                duration: Duration::from_millis(5),
            },
            per_class: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Instrumentation that refuses everything with one reason
    pub fn refusing(reason: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            default: RedefinitionOutcome::Refused {
                reason: reason.into(),
                error_code,
            },
            per_class: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the outcome for one class name
    pub fn with_outcome(
        mut self,
        class_name: impl Into<String>,
        outcome: RedefinitionOutcome,
    ) -> Self {
        self.per_class.insert(class_name.into(), outcome);
        self
    }

    /// Class names redefinition was requested for, in call order
    pub fn redefined_classes(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Instrumentation for MockInstrumentation {
    async fn redefine_class(
        &self,
        class_name: &str,
        _class_file: &Path,
        _bytecode: &[u8],
    ) -> HotswapResult<RedefinitionOutcome> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(class_name.to_string());
        Ok(self
            .per_class
            .get(class_name)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Instance tracker with fixed per-class answers
#[derive(Debug, Default)]
pub struct FixedInstanceTracker {
    counts: HashMap<String, Option<usize>>,
    dependents: HashMap<String, Vec<String>>,
}

impl FixedInstanceTracker {
    /// Tracker that reports zero instances and no dependents for everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the live-instance answer for one class (`None` = undeterminable)
    pub fn with_instances(mut self, class_name: impl Into<String>, count: Option<usize>) -> Self {
        self.counts.insert(class_name.into(), count);
        self
    }

    /// Fix the dependent set for one class
    pub fn with_dependents(
        mut self,
        class_name: impl Into<String>,
        dependents: Vec<String>,
    ) -> Self {
        self.dependents.insert(class_name.into(), dependents);
        self
    }
}

impl InstanceTracker for FixedInstanceTracker {
    fn live_instance_count(&self, class_name: &str) -> Option<usize> {
        self.counts.get(class_name).copied().unwrap_or(Some(0))
    }

    fn dependent_types(&self, class_name: &str) -> Vec<String> {
        self.dependents.get(class_name).cloned().unwrap_or_default()
    }
}

/// Emitter that collects everything it is handed
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    emitted: Mutex<Vec<VersionedEvent>>,
}

impl CollectingEmitter {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far, in emission order
    pub fn emitted(&self) -> Vec<VersionedEvent> {
        self.emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventEmitter for CollectingEmitter {
    async fn emit(&self, event: &VersionedEvent) -> HotswapResult<()> {
        self.emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}

/// File watcher fed through an in-process channel
pub struct ChannelFileWatcher {
    rx: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<FileChangeNotification>>,
}

impl ChannelFileWatcher {
    /// Watcher plus the sender used to feed it observations
    pub fn new() -> (
        Self,
        tokio::sync::mpsc::UnboundedSender<FileChangeNotification>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            Self {
                rx: tokio::sync::Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl FileWatcher for ChannelFileWatcher {
    async fn next_change(&self) -> Option<FileChangeNotification> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sequential_ids_are_stable_and_distinct() {
        let generator = SequentialIdGenerator::new();
        assert_eq!(generator.next_id(), Uuid::from_u128(1));
        assert_eq!(generator.next_id(), Uuid::from_u128(2));

        let replayed = SequentialIdGenerator::new();
        assert_eq!(replayed.next_id(), Uuid::from_u128(1));
    }

    #[test]
    fn stepping_clock_is_deterministic() {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::stepping(base, TimeDelta::seconds(1));
        assert_eq!(clock.now(), base);
        assert_eq!(clock.now(), base + TimeDelta::seconds(1));

        let frozen = FixedClock::frozen(base);
        assert_eq!(frozen.now(), frozen.now());
    }

    #[tokio::test]
    async fn unscripted_analyzer_path_is_unreadable() {
        let analyzer = MockBytecodeAnalyzer::new();
        let err = analyzer
            .extract_fingerprint(Path::new("/build/Nope.class"))
            .await
            .expect_err("unscripted path");
        assert!(matches!(err, AnalyzerError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn channel_watcher_drains_in_order_then_ends() {
        let (watcher, tx) = ChannelFileWatcher::new();
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        tx.send(FileChangeNotification {
            path: PathBuf::from("/build/A.class"),
            kind: crate::domain::FileChangeKind::Modified,
            observed_at: base,
            file_size: 10,
        })
        .expect("send");
        drop(tx);

        let first = watcher.next_change().await.expect("one observation");
        assert_eq!(first.path, PathBuf::from("/build/A.class"));
        assert!(watcher.next_change().await.is_none());
    }
}
