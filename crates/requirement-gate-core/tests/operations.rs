// crates/requirement-gate-core/tests/operations.rs
// ============================================================================
// Module: Operation Tests
// Description: Satisfy, clear, approve, status, and prune operations.
// Purpose: Validate the explicit user operations and their errors.
// Dependencies: requirement-gate-core
// ============================================================================
//! ## Overview
//! Explicit operations may reject unknown names and misuse; these tests pin
//! those errors and the status snapshot shape.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeSet;

use common::Harness;
use common::blocking;
use common::branch_size_limit;
use common::guard;
use common::target;
use requirement_gate_core::BranchName;
use requirement_gate_core::GuardKind;
use requirement_gate_core::OperationError;
use requirement_gate_core::RequirementName;
use requirement_gate_core::SatisfactionMethod;
use requirement_gate_core::Scope;
use requirement_gate_core::runtime::SatisfyRequest;
use requirement_gate_core::runtime::operations;

#[test]
fn satisfy_rejects_unknown_names_before_writing() {
    let harness = Harness::new();
    let requirements = vec![blocking("commit_plan", Scope::Session)];
    let result = operations::satisfy(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &[RequirementName::new("commit_plan"), RequirementName::new("typo")],
        &SatisfyRequest::default(),
    );
    assert!(matches!(result, Err(OperationError::UnknownRequirement(name)) if name == "typo"));
    assert_eq!(harness.store.write_count(), 0);
}

#[test]
fn satisfy_honors_scope_override_and_ttl() {
    let harness = Harness::new();
    let requirements = vec![blocking("commit_plan", Scope::Session)];
    let outcomes = operations::satisfy(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &[RequirementName::new("commit_plan")],
        &SatisfyRequest {
            scope: Some(Scope::Branch),
            metadata: None,
            ttl: Some(60),
        },
    )
    .expect("satisfy");
    assert_eq!(outcomes[0].scope, Scope::Branch);
    let other = harness.services.engine(&"feature/x".into(), &"s2".into());
    assert!(other.is_satisfied(&RequirementName::new("commit_plan"), Scope::Session));
    harness.clock.advance_secs(61);
    assert!(!other.is_satisfied(&RequirementName::new("commit_plan"), Scope::Session));
}

#[test]
fn satisfy_on_dynamic_requirement_records_approval() {
    let harness = Harness::new();
    let requirements = vec![branch_size_limit()];
    let outcomes = operations::satisfy(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &[RequirementName::new("branch_size_limit")],
        &SatisfyRequest::default(),
    )
    .expect("satisfy");
    assert!(outcomes[0].approved);
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    assert!(engine.is_approved(&RequirementName::new("branch_size_limit")));
}

#[test]
fn approve_rejects_blocking_requirements() {
    let harness = Harness::new();
    let requirements = vec![blocking("commit_plan", Scope::Session)];
    let result = operations::approve(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &RequirementName::new("commit_plan"),
        None,
    );
    assert!(matches!(result, Err(OperationError::NotApprovable(_))));
}

#[test]
fn clear_all_resets_every_requirement() {
    let harness = Harness::new();
    let requirements = vec![blocking("a", Scope::Session), blocking("b", Scope::Branch)];
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&RequirementName::new("a"), Scope::Session, SatisfactionMethod::Cli, None, None);
    engine.satisfy(&RequirementName::new("b"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    assert_eq!(operations::clear_all(&harness.services, &requirements, &target("feature/x", "s1")), 2);
    assert!(!engine.is_satisfied(&RequirementName::new("a"), Scope::Session));
    assert!(!engine.is_satisfied(&RequirementName::new("b"), Scope::Branch));
}

#[test]
fn clear_revokes_approval_of_branch_scoped_dynamic_requirement() {
    let harness = Harness::new();
    let mut requirement = branch_size_limit();
    requirement.scope = Scope::Branch;
    let requirements = vec![requirement];
    let session = target("feature/x", "s1");
    let name = RequirementName::new("branch_size_limit");
    operations::approve(&harness.services, &requirements, &session, &name, None).expect("approve");

    let cleared = operations::clear(&harness.services, &requirements, &session, &name, None).expect("clear");
    assert_eq!(cleared, Scope::Session);
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    assert!(!engine.is_approved(&name));

    operations::approve(&harness.services, &requirements, &session, &name, None).expect("approve again");
    assert_eq!(operations::clear_all(&harness.services, &requirements, &session), 1);
    assert!(!engine.is_approved(&name));
}

#[test]
fn status_reports_effective_entries() {
    let harness = Harness::new();
    let requirements = vec![blocking("commit_plan", Scope::Session), blocking("adr", Scope::Branch)];
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&RequirementName::new("commit_plan"), Scope::Session, SatisfactionMethod::Cli, None, Some(30));
    engine.mark_triggered(&RequirementName::new("adr"), Scope::Branch);

    let report = operations::status(&harness.services, &requirements, &target("feature/x", "s1"));
    let plan = &report.requirements[0];
    assert!(plan.satisfied);
    assert_eq!(plan.method, Some(SatisfactionMethod::Cli));
    let expected_expiry = plan.satisfied_at.expect("satisfied_at").as_unix_millis() + 30_000;
    assert_eq!(plan.expires_at.map(|at| at.as_unix_millis()), Some(expected_expiry));
    let unsatisfied: Vec<&str> = report.unsatisfied().iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(unsatisfied, vec!["adr"]);
}

#[test]
fn pending_list_leaves_out_dynamic_and_guard_requirements() {
    let harness = Harness::new();
    let requirements = vec![
        blocking("commit_plan", Scope::Session),
        branch_size_limit(),
        guard("protected_branch", GuardKind::ProtectedBranch),
    ];
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    for spec in &requirements {
        engine.mark_triggered(&spec.name, spec.scope);
    }

    let report = operations::status(&harness.services, &requirements, &target("feature/x", "s1"));
    assert!(report.requirements.iter().all(|entry| entry.triggered && !entry.satisfied));
    let pending: Vec<&str> = report.unsatisfied().iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(pending, vec!["commit_plan"]);
}

#[test]
fn prune_removes_deleted_branches_and_sweeps_the_rest() {
    let harness = Harness::new();
    let live = harness.services.engine(&"feature/live".into(), &"s1".into());
    let gone = harness.services.engine(&"feature/gone".into(), &"s1".into());
    live.satisfy(&RequirementName::new("short"), Scope::Branch, SatisfactionMethod::Cli, None, Some(1));
    live.satisfy(&RequirementName::new("long"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    gone.satisfy(&RequirementName::new("long"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    harness.clock.advance_secs(10);

    let existing: BTreeSet<BranchName> = [BranchName::new("feature/live")].into_iter().collect();
    let report = operations::prune(&harness.services, &existing).expect("prune");
    assert_eq!(report.removed_branches, vec![BranchName::new("feature/gone")]);
    assert_eq!(report.swept_entries, 1);
    assert!(live.is_satisfied(&RequirementName::new("long"), Scope::Branch));
}
