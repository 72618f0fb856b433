// crates/requirement-gate-core/tests/lifecycle.rs
// ============================================================================
// Module: Lifecycle Hook Tests
// Description: Session start, post-action, stop verification, and session end.
// Purpose: Validate how host lifecycle events change requirement state.
// Dependencies: requirement-gate-core
// ============================================================================
//! ## Overview
//! Covers skill auto-satisfaction, single-use clearing on commit, stop-time
//! verification restricted to triggered requirements, and session cleanup.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use common::Harness;
use common::blocking;
use common::edit;
use common::settings;
use common::target;
use requirement_gate_core::CommandPattern;
use requirement_gate_core::CompletedAction;
use requirement_gate_core::DEFAULT_SINGLE_USE_CLEAR_PATTERN;
use requirement_gate_core::RequirementChecker;
use requirement_gate_core::RequirementName;
use requirement_gate_core::SatisfactionMethod;
use requirement_gate_core::Scope;
use requirement_gate_core::SessionRegistry;
use requirement_gate_core::runtime::lifecycle;

#[test]
fn skill_completion_satisfies_mapped_requirements() {
    let harness = Harness::new();
    let mut plan = blocking("commit_plan", Scope::Session);
    plan.satisfied_by_skills = vec!["plan-commits".to_string()];
    let requirements = vec![plan, blocking("adr", Scope::Session)];
    let report = lifecycle::post_action(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &CompletedAction::Skill {
            name: "plan-commits".to_string(),
        },
    );
    assert_eq!(report.satisfied, vec![RequirementName::new("commit_plan")]);
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    assert!(engine.is_satisfied(&RequirementName::new("commit_plan"), Scope::Session));
    assert!(!engine.is_satisfied(&RequirementName::new("adr"), Scope::Session));
    let entry = engine.document().requirement(&RequirementName::new("commit_plan")).cloned().expect("state");
    let session_entry = entry.session_satisfaction(&"s1".into()).expect("entry");
    assert_eq!(session_entry.method, SatisfactionMethod::Skill);
}

#[test]
fn commit_clears_single_use_requirements() {
    let harness = Harness::new();
    let mut pre_commit = blocking("pre_commit_review", Scope::SingleUse);
    pre_commit.clear_on = vec![CommandPattern::new(DEFAULT_SINGLE_USE_CLEAR_PATTERN).expect("pattern")];
    let requirements = vec![pre_commit, blocking("commit_plan", Scope::Session)];
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&RequirementName::new("pre_commit_review"), Scope::SingleUse, SatisfactionMethod::Cli, None, None);
    engine.satisfy(&RequirementName::new("commit_plan"), Scope::Session, SatisfactionMethod::Cli, None, None);

    let ls = lifecycle::post_action(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &CompletedAction::Command {
            text: "ls -la".to_string(),
        },
    );
    assert!(ls.cleared.is_empty());

    let commit = lifecycle::post_action(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &CompletedAction::Command {
            text: "git commit -m 'wip'".to_string(),
        },
    );
    assert_eq!(commit.cleared, vec![RequirementName::new("pre_commit_review")]);
    assert!(!engine.is_satisfied(&RequirementName::new("pre_commit_review"), Scope::SingleUse));
    assert!(engine.is_satisfied(&RequirementName::new("commit_plan"), Scope::Session));
}

#[test]
fn stop_reports_only_triggered_unsatisfied_requirements_in_scope() {
    let harness = Harness::new();
    let requirements = vec![
        blocking("commit_plan", Scope::Session),
        blocking("never_touched", Scope::Session),
        blocking("adr", Scope::Branch),
    ];
    let mut touched = requirements.clone();
    touched.retain(|spec| spec.name.as_str() != "never_touched");
    let checker = RequirementChecker::new(&harness.services, &touched, settings());
    let _ = checker.check(&edit("feature/x", "s1"));

    let pending =
        lifecycle::session_stop(&harness.services, &requirements, &target("feature/x", "s1"), &[Scope::Session]);
    let names: Vec<&str> = pending.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["commit_plan"]);

    let all = lifecycle::session_stop(
        &harness.services,
        &requirements,
        &target("feature/x", "s1"),
        &[Scope::Session, Scope::Branch],
    );
    assert_eq!(all.len(), 2);

    let other =
        lifecycle::session_stop(&harness.services, &requirements, &target("feature/x", "s2"), &[Scope::Session]);
    assert!(other.is_empty());
}

#[test]
fn session_end_drops_session_entries_in_one_write() {
    let harness = Harness::new();
    let engine = harness.services.engine(&"feature/x".into(), &"s1".into());
    engine.satisfy(&RequirementName::new("a"), Scope::Session, SatisfactionMethod::Cli, None, None);
    engine.satisfy(&RequirementName::new("b"), Scope::Session, SatisfactionMethod::Cli, None, None);
    engine.satisfy(&RequirementName::new("c"), Scope::Branch, SatisfactionMethod::Cli, None, None);
    let writes = harness.store.write_count();
    lifecycle::session_end(&harness.services, &target("feature/x", "s1"));
    assert_eq!(harness.store.write_count(), writes + 1);
    assert!(!engine.is_satisfied(&RequirementName::new("a"), Scope::Session));
    assert!(engine.is_satisfied(&RequirementName::new("c"), Scope::Branch));
}

#[test]
fn session_start_registers_and_summarizes() {
    let harness = Harness::new();
    let requirements = vec![blocking("commit_plan", Scope::Session)];
    let summary = lifecycle::session_start(&harness.services, &requirements, &target("feature/x", "s1"));
    assert_eq!(summary.requirements.len(), 1);
    assert!(!summary.requirements[0].satisfied);
    let sessions = harness.services.sessions.list().expect("list");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session.as_str(), "s1");
}
