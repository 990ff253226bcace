// Copyright (c) 2025 - Hotswap Core Contributors
//! Swap attempt lifecycle
//!
//! The per-file state is implicit: it is whatever the last appended event
//! of the stream says. [`SwapLifecycle`] makes that state explicit for
//! transition checking, without ever being stored itself.
//!
//! ```text
//! Detected → MetadataExtracted → Validated → HotSwapRequested → Redefined → InstancesUpdated
//!                     ↓              ↓                              ↓
//!                  Rejected       Rejected                 RedefinitionFailed
//! ```
//!
//! `Rejected`, `RedefinitionFailed` and `InstancesUpdated` end the attempt;
//! the stream stays open for the next change, which starts a fresh attempt
//! at `Detected`.

use thiserror::Error;

use crate::events::HotswapEvent;

/// State of one swap attempt, inferred from the last appended event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapLifecycle {
    /// A change was detected on disk
    Detected,
    /// The analyzer produced a fingerprint
    MetadataExtracted,
    /// The validator accepted the change
    Validated,
    /// The validator (or an unreadable file) rejected the change
    Rejected,
    /// Redefinition was requested from the runtime
    HotSwapRequested,
    /// The runtime redefined the class
    Redefined,
    /// The runtime refused the redefinition
    RedefinitionFailed,
    /// Live instances were brought up to date
    InstancesUpdated,
}

/// An attempted transition the lifecycle does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition {from:?} -> {to:?}")]
pub struct TransitionError {
    /// State the attempt was in
    pub from: SwapLifecycle,
    /// State the event would have moved it to
    pub to: SwapLifecycle,
}

impl SwapLifecycle {
    /// The lifecycle state a committed event leaves its stream in
    pub fn from_event(event: &HotswapEvent) -> Option<Self> {
        match event {
            HotswapEvent::ClassFileChanged(_) => Some(SwapLifecycle::Detected),
            HotswapEvent::ClassMetadataExtracted(_) => Some(SwapLifecycle::MetadataExtracted),
            HotswapEvent::BytecodeValidated(_) => Some(SwapLifecycle::Validated),
            HotswapEvent::BytecodeRejected(_) => Some(SwapLifecycle::Rejected),
            HotswapEvent::HotSwapRequested(_) => Some(SwapLifecycle::HotSwapRequested),
            HotswapEvent::ClassRedefinitionSucceeded(_) => Some(SwapLifecycle::Redefined),
            HotswapEvent::ClassRedefinitionFailed(_) => Some(SwapLifecycle::RedefinitionFailed),
            HotswapEvent::InstancesUpdated(_) => Some(SwapLifecycle::InstancesUpdated),
            // Deletions belong to the cleanup branch, not a swap attempt.
            HotswapEvent::ClassFileDeleted(_) => None,
        }
    }

    /// States this state may move to
    pub fn valid_transitions(&self) -> &'static [SwapLifecycle] {
        match self {
            SwapLifecycle::Detected => {
                &[SwapLifecycle::MetadataExtracted, SwapLifecycle::Rejected]
            }
            SwapLifecycle::MetadataExtracted => {
                &[SwapLifecycle::Validated, SwapLifecycle::Rejected]
            }
            SwapLifecycle::Validated => &[SwapLifecycle::HotSwapRequested],
            SwapLifecycle::HotSwapRequested => {
                &[SwapLifecycle::Redefined, SwapLifecycle::RedefinitionFailed]
            }
            SwapLifecycle::Redefined => &[SwapLifecycle::InstancesUpdated],
            // Terminal states only restart at Detected (a new change).
            SwapLifecycle::Rejected
            | SwapLifecycle::RedefinitionFailed
            | SwapLifecycle::InstancesUpdated => &[SwapLifecycle::Detected],
        }
    }

    /// Whether the state may move to `target`
    pub fn can_transition_to(&self, target: SwapLifecycle) -> bool {
        self.valid_transitions().contains(&target)
    }

    /// Check a transition, producing the new state or an error
    pub fn transition_to(self, target: SwapLifecycle) -> Result<SwapLifecycle, TransitionError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(TransitionError {
                from: self,
                to: target,
            })
        }
    }

    /// Whether this state ends the current swap attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapLifecycle::Rejected
                | SwapLifecycle::RedefinitionFailed
                | SwapLifecycle::InstancesUpdated
        )
    }
}
