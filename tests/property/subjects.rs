// Copyright (c) 2025 - Hotswap Core Contributors
//! Subject token sanitization invariants

use proptest::prelude::*;

use hotswap_core::subjects::{sanitize_token, SubjectBuilder};

proptest! {
    /// Sanitized tokens never contain characters NATS treats as structural.
    #[test]
    fn tokens_are_always_valid(raw in ".*") {
        let token = sanitize_token(&raw);
        prop_assert!(!token.is_empty());
        prop_assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    /// Built subjects always have exactly the expected dot structure.
    #[test]
    fn subjects_have_fixed_arity(
        aggregate in "[a-zA-Z0-9 ./]{1,20}",
        class in "[a-zA-Z0-9 ./$]{1,30}",
        operation in "[a-z_]{1,30}",
    ) {
        let subject = SubjectBuilder::new()
            .aggregate(&aggregate)
            .class(&class)
            .operation(&operation)
            .build();
        prop_assert_eq!(subject.split('.').count(), 4);
        prop_assert!(subject.starts_with("hotswap."));
    }
}
