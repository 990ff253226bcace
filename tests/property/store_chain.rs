// Copyright (c) 2025 - Hotswap Core Contributors
//! Stream versioning and causal-chain invariants
//!
//! For any interleaving of appends across any number of streams:
//! - per-stream versions are strictly increasing and gap-free from 1
//! - version 1 has no previous-event id; version n references version n−1
//! - global stream positions are strictly increasing in commit order

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use hotswap_core::event_store::{EventStore, InMemoryEventStore};
use hotswap_core::events::hotswap::{ClassFileChanged, HotswapEvent};
use hotswap_core::events::{EventDraft, FILEWATCH_AGGREGATE};

/// An append schedule: each element picks one of four streams
fn append_schedule() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 1..40)
}

fn changed_draft(stream: u8, sequence: usize) -> EventDraft {
    let path = format!("/build/classes/Stream{stream}.class");
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    EventDraft::new(
        FILEWATCH_AGGREGATE,
        &path,
        Uuid::from_u128(sequence as u128 + 1),
        at,
        HotswapEvent::ClassFileChanged(ClassFileChanged {
            class_file: PathBuf::from(&path),
            class_name: format!("Stream{stream}"),
            file_size: sequence as u64,
            detected_at: at,
        }),
    )
}

proptest! {
    #[test]
    fn versions_are_gap_free_and_chained(schedule in append_schedule()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let store = InMemoryEventStore::new();
            for (sequence, stream) in schedule.iter().enumerate() {
                store
                    .append(changed_draft(*stream, sequence))
                    .await
                    .expect("append");
            }

            let mut last_position = 0u64;
            let mut per_stream: HashMap<String, Vec<_>> = HashMap::new();
            for stream in 0u8..4 {
                let path = format!("/build/classes/Stream{stream}.class");
                let events = store
                    .stream_for(FILEWATCH_AGGREGATE, &path)
                    .await
                    .expect("stream");
                per_stream.insert(path, events);
            }

            for events in per_stream.values() {
                for (index, event) in events.iter().enumerate() {
                    prop_assert_eq!(event.metadata.aggregate_version, index as u64 + 1);
                    if index == 0 {
                        prop_assert_eq!(event.metadata.previous_event_id, None);
                    } else {
                        prop_assert_eq!(
                            event.metadata.previous_event_id,
                            Some(events[index - 1].metadata.event_id)
                        );
                    }
                }
            }

            // Commit order: walk the global chronology through the type index.
            let chronology = store
                .events_by_type("ClassFileChanged")
                .await
                .expect("chronology");
            prop_assert_eq!(chronology.len(), schedule.len());
            for event in &chronology {
                let position = event.metadata.stream_position.expect("position assigned");
                prop_assert!(position > last_position);
                last_position = position;
            }
            Ok(())
        })?;
    }

    #[test]
    fn stale_expected_versions_always_conflict(
        appends in 1usize..6,
        stale in 0u64..20,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let store = InMemoryEventStore::new();
            for sequence in 0..appends {
                store
                    .append(changed_draft(0, sequence).with_expected_version(sequence as u64))
                    .await
                    .expect("append");
            }

            let result = store
                .append(changed_draft(0, appends).with_expected_version(stale))
                .await;
            if stale == appends as u64 {
                prop_assert!(result.is_ok());
            } else {
                let conflicted = matches!(
                    result,
                    Err(hotswap_core::HotswapError::Concurrency { .. })
                );
                prop_assert!(conflicted, "stale expected_version must conflict");
            }
            Ok(())
        })?;
    }
}
