// Copyright (c) 2025 - Hotswap Core Contributors
//! Deletion impact classification invariants

use proptest::prelude::*;

use hotswap_core::domain::{CleanupStrategy, DeletionImpact};

proptest! {
    /// An undeterminable live count must never classify below High.
    #[test]
    fn unknown_live_count_never_classifies_low(dependents in 0usize..200) {
        let impact = DeletionImpact::classify(None, dependents);
        prop_assert!(impact >= DeletionImpact::High);
    }

    /// More instances or more dependents never lowers the impact.
    #[test]
    fn classification_is_monotone(
        live in 0usize..300,
        dependents in 0usize..50,
        extra_live in 0usize..300,
        extra_dependents in 0usize..50,
    ) {
        let base = DeletionImpact::classify(Some(live), dependents);
        let grown = DeletionImpact::classify(
            Some(live + extra_live),
            dependents + extra_dependents,
        );
        prop_assert!(grown >= base);
    }

    /// Strategy follows impact deterministically, for every input.
    #[test]
    fn strategy_is_a_function_of_impact(
        live in proptest::option::of(0usize..300),
        dependents in 0usize..50,
    ) {
        let impact = DeletionImpact::classify(live, dependents);
        let expected = match impact {
            DeletionImpact::Critical | DeletionImpact::High => {
                CleanupStrategy::AggressiveImmediate
            }
            DeletionImpact::Medium => CleanupStrategy::GracefulDeferred,
            DeletionImpact::Low => CleanupStrategy::BackgroundBatched,
        };
        prop_assert_eq!(impact.recommended_strategy(), expected);

        // Classification is pure: same inputs, same answer.
        prop_assert_eq!(DeletionImpact::classify(live, dependents), impact);
    }
}
