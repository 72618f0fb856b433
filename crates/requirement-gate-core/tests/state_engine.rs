// crates/requirement-gate-core/tests/state_engine.rs
// ============================================================================
// Module: State Engine Tests
// Description: Scope isolation, override precedence, TTL expiry, and triggering.
// Purpose: Validate the satisfaction model of the requirement state engine.
// Dependencies: requirement-gate-core
// ============================================================================
//! ## Overview
//! Exercises the state engine through in-memory services with a manual clock
//! so TTL expiry is observed without sleeping.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use common::Harness;
use requirement_gate_core::RequirementName;
use requirement_gate_core::SatisfactionMethod;
use requirement_gate_core::Scope;

fn name(value: &str) -> RequirementName {
    RequirementName::new(value)
}

#[test]
fn session_satisfaction_does_not_leak_to_other_sessions() {
    let harness = Harness::new();
    let first = harness.services.engine(&"feature/x".into(), &"s1".into());
    let second = harness.services.engine(&"feature/x".into(), &"s2".into());
    first.satisfy(&name("commit_plan"), Scope::Session, SatisfactionMethod::Cli, None, None);
    assert!(first.is_satisfied(&name("commit_plan"), Scope::Session));
    assert!(!second.is_satisfied(&name("commit_plan"), Scope::Session));
}

#[test]
fn branch_override_satisfies_every_session() {
    let harness = Harness::new();
    let writer = harness.services.engine(&"feature/x".into(), &"s1".into());
    writer.satisfy(&name("commit_plan"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    for session in ["s1", "s2", "s3"] {
        let engine = harness.services.engine(&"feature/x".into(), &session.into());
        assert!(engine.is_satisfied(&name("commit_plan"), Scope::Session));
        assert!(engine.is_satisfied(&name("commit_plan"), Scope::SingleUse));
        assert!(engine.is_satisfied(&name("commit_plan"), Scope::Branch));
    }
    let other_branch = harness.services.engine(&"feature/y".into(), &"s1".into());
    assert!(!other_branch.is_satisfied(&name("commit_plan"), Scope::Session));
}

#[test]
fn ttl_expires_lazily_without_clear() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&name("adr_reviewed"), Scope::Session, SatisfactionMethod::Cli, None, Some(1));
    assert!(engine.is_satisfied(&name("adr_reviewed"), Scope::Session));
    harness.clock.advance_secs(2);
    assert!(!engine.is_satisfied(&name("adr_reviewed"), Scope::Session));
    let document = engine.document();
    assert!(document.requirement(&name("adr_reviewed")).is_some(), "expired entries stay until swept");
}

#[test]
fn clearing_unsatisfied_requirement_is_harmless() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.clear(&name("commit_plan"), Scope::Session);
    engine.clear(&name("commit_plan"), Scope::Branch);
    assert!(!engine.is_satisfied(&name("commit_plan"), Scope::Session));
}

#[test]
fn clear_removes_only_the_targeted_granularity() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&name("commit_plan"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    engine.satisfy(&name("commit_plan"), Scope::Session, SatisfactionMethod::Cli, None, None);
    engine.clear(&name("commit_plan"), Scope::Branch);
    assert!(engine.is_satisfied(&name("commit_plan"), Scope::Session));
    engine.clear(&name("commit_plan"), Scope::Session);
    assert!(!engine.is_satisfied(&name("commit_plan"), Scope::Session));
}

#[test]
fn triggered_is_independent_of_satisfied() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.mark_triggered(&name("commit_plan"), Scope::Session);
    assert!(engine.is_triggered(&name("commit_plan"), Scope::Session));
    assert!(!engine.is_satisfied(&name("commit_plan"), Scope::Session));

    let other = harness.services.engine(&"feature/x".into(), &"s2".into());
    assert!(!other.is_triggered(&name("commit_plan"), Scope::Session));
}

#[test]
fn each_mutation_writes_once() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&name("a"), Scope::Session, SatisfactionMethod::Cli, None, None);
    assert_eq!(harness.store.write_count(), 1);
    engine.mark_triggered(&name("a"), Scope::Session);
    assert_eq!(harness.store.write_count(), 2);
    engine.clear(&name("a"), Scope::Session);
    assert_eq!(harness.store.write_count(), 3);
}

#[test]
fn sweep_removes_expired_entries_only() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&name("short"), Scope::Branch, SatisfactionMethod::Cli, None, Some(1));
    engine.satisfy(&name("long"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    harness.clock.advance_secs(5);
    assert_eq!(engine.sweep_expired(), 1);
    let document = engine.document();
    assert!(document.requirement(&name("short")).is_none());
    assert!(document.requirement(&name("long")).is_some());
}

#[test]
fn remove_session_keeps_branch_state() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&name("pinned"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    engine.satisfy(&name("plan"), Scope::Session, SatisfactionMethod::Cli, None, None);
    engine.remove_session();
    assert!(engine.is_satisfied(&name("pinned"), Scope::Branch));
    assert!(!engine.is_satisfied(&name("plan"), Scope::Session));
}
