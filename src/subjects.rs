// Copyright (c) 2025 - Hotswap Core Contributors
//! NATS subject hierarchy for hot-swap events
//!
//! All published events follow the hierarchical pattern:
//!
//! ```text
//! hotswap.{aggregate}.{class}.{operation}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`hotswap.filewatch.OrderService.bytecode_rejected`)
//! - Per-class wildcards (`hotswap.filewatch.OrderService.>`)
//! - Global subscriptions (`hotswap.>`)
//!
//! # Examples
//!
//! ```rust
//! use hotswap_core::subjects::SubjectBuilder;
//!
//! let subject = SubjectBuilder::new()
//!     .aggregate("filewatch")
//!     .class("OrderService")
//!     .operation("bytecode_rejected")
//!     .build();
//! assert_eq!(subject, "hotswap.filewatch.OrderService.bytecode_rejected");
//!
//! let wildcard = SubjectBuilder::new()
//!     .aggregate("filewatch")
//!     .build_wildcard();
//! assert_eq!(wildcard, "hotswap.filewatch.>");
//! ```

use crate::events::{HotswapEvent, VersionedEvent};

/// Root namespace for all hot-swap subjects
pub const HOTSWAP_ROOT: &str = "hotswap";

/// Replace characters NATS treats as structural with underscores
///
/// Class names and aggregate tokens can contain dots (nested types),
/// spaces or path separators; none of those may leak into a subject token.
pub fn sanitize_token(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// The operation token for an event payload (its serde tag)
pub fn operation_token(event: &HotswapEvent) -> &'static str {
    match event {
        HotswapEvent::ClassFileChanged(_) => "class_file_changed",
        HotswapEvent::ClassFileDeleted(_) => "class_file_deleted",
        HotswapEvent::ClassMetadataExtracted(_) => "class_metadata_extracted",
        HotswapEvent::BytecodeValidated(_) => "bytecode_validated",
        HotswapEvent::BytecodeRejected(_) => "bytecode_rejected",
        HotswapEvent::HotSwapRequested(_) => "hot_swap_requested",
        HotswapEvent::ClassRedefinitionSucceeded(_) => "class_redefinition_succeeded",
        HotswapEvent::ClassRedefinitionFailed(_) => "class_redefinition_failed",
        HotswapEvent::InstancesUpdated(_) => "instances_updated",
    }
}

/// Subject a committed event is published on
pub fn subject_for_event(event: &VersionedEvent) -> String {
    SubjectBuilder::new()
        .aggregate(&event.metadata.aggregate_type)
        .class(event.payload.class_name())
        .operation(operation_token(&event.payload))
        .build()
}

/// Builder for hierarchical hot-swap subjects
#[derive(Debug, Default, Clone)]
pub struct SubjectBuilder {
    aggregate: Option<String>,
    class: Option<String>,
    operation: Option<String>,
}

impl SubjectBuilder {
    /// Start an empty subject under the hotswap root
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the aggregate token (e.g. "filewatch")
    pub fn aggregate(mut self, aggregate: &str) -> Self {
        self.aggregate = Some(sanitize_token(aggregate));
        self
    }

    /// Set the class token
    pub fn class(mut self, class_name: &str) -> Self {
        self.class = Some(sanitize_token(class_name));
        self
    }

    /// Set the operation token
    pub fn operation(mut self, operation: &str) -> Self {
        self.operation = Some(sanitize_token(operation));
        self
    }

    /// Build the full subject from the tokens set so far
    pub fn build(self) -> String {
        let mut parts = vec![HOTSWAP_ROOT.to_string()];
        parts.extend(self.aggregate);
        parts.extend(self.class);
        parts.extend(self.operation);
        parts.join(".")
    }

    /// Build a subscription wildcard covering everything below the tokens
    /// set so far
    pub fn build_wildcard(self) -> String {
        let mut subject = Self {
            operation: None,
            ..self
        }
        .build();
        subject.push_str(".>");
        subject
    }
}
