//! Branch file-stem encoding tests for requirement-gate-core.
// crates/requirement-gate-core/tests/identifiers.rs
// =============================================================================
// Module: Branch Encoding Tests
// Description: Property checks for branch name file stems.
// Purpose: Ensure every branch maps to a distinct, filesystem-safe stem.
// =============================================================================

use proptest::prelude::*;
use requirement_gate_core::BranchName;

proptest! {
    #[test]
    fn file_stem_round_trips(name in "\\PC{0,40}") {
        let branch = BranchName::new(name);
        prop_assert_eq!(BranchName::from_file_stem(&branch.file_stem()), Some(branch));
    }

    #[test]
    fn file_stem_uses_safe_bytes(name in "\\PC{0,40}") {
        let stem = BranchName::new(name).file_stem();
        prop_assert!(stem.bytes().all(|byte| byte.is_ascii_alphanumeric() || b"._-%".contains(&byte)));
    }

    #[test]
    fn distinct_branches_get_distinct_stems(a in "[a-z/_.-]{1,12}", b in "[a-z/_.-]{1,12}") {
        prop_assume!(a != b);
        prop_assert_ne!(BranchName::new(a).file_stem(), BranchName::new(b).file_stem());
    }
}
