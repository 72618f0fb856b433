//! Hook adapter flow tests for requirement-gate-cli.
// crates/requirement-gate-cli/tests/hooks.rs
// ============================================================================
// Module: Hook Adapter Tests
// Description: Drives the host hook adapters over in-memory services.
// Purpose: Verify deny, stop, post-action, and session lifecycle responses.
// Dependencies: requirement-gate-cli, requirement-gate-config, requirement-gate-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use requirement_gate_cli::hooks::HookEvent;
use requirement_gate_cli::hooks::HookInput;
use requirement_gate_cli::hooks::respond;
use requirement_gate_config::ConfigLayer;
use requirement_gate_config::EffectiveConfig;
use requirement_gate_core::BranchName;
use requirement_gate_core::GateServices;
use requirement_gate_core::ManualClock;
use requirement_gate_core::RequirementName;
use requirement_gate_core::SessionContext;
use requirement_gate_core::SessionId;
use requirement_gate_core::Timestamp;
use requirement_gate_core::runtime::CalculationCache;
use requirement_gate_core::runtime::DedupCache;
use requirement_gate_core::runtime::InMemoryBranchStateStore;
use requirement_gate_core::runtime::InMemorySessionRegistry;
use requirement_gate_core::runtime::InMemoryTtlStore;
use requirement_gate_core::runtime::SatisfyRequest;
use requirement_gate_core::runtime::operations;
use requirement_gate_core::telemetry::MemoryEventSink;
use requirement_gate_providers::BuiltinCalculators;
use requirement_gate_providers::BuiltinGuards;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// In-memory services with a manual clock.
fn services() -> GateServices {
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1_700_000_000_000)));
    let sink = Arc::new(MemoryEventSink::new());
    GateServices {
        store: Arc::new(InMemoryBranchStateStore::new()),
        dedup: DedupCache::new(Arc::new(InMemoryTtlStore::new()), clock.clone(), sink.clone()),
        calculations: CalculationCache::new(Arc::new(InMemoryTtlStore::new()), clock.clone(), sink.clone()),
        calculators: Arc::new(BuiltinCalculators::default()),
        guards: Arc::new(BuiltinGuards::default()),
        sessions: Arc::new(InMemorySessionRegistry::new()),
        clock,
        sink,
    }
}

/// Finalizes a configuration document.
fn config(document: Value) -> EffectiveConfig {
    let layer: ConfigLayer = serde_json::from_value(document).expect("valid layer");
    let (config, warnings) = EffectiveConfig::from_layer(layer);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    config
}

/// Standard requirement set used by most tests.
fn standard_config() -> EffectiveConfig {
    config(json!({
        "requirements": {
            "commit_plan": {
                "type": "blocking",
                "scope": "session",
                "message": "Write a commit plan first.",
                "satisfied_by_skills": ["commit-plan"]
            },
            "pre_commit_review": {
                "type": "blocking",
                "scope": "single_use",
                "trigger_tools": [{ "tool": "Bash", "command_pattern": "git\\s+commit" }]
            }
        }
    }))
}

fn target(branch: &str, session: &str) -> SessionContext {
    SessionContext {
        project: PathBuf::from("/work/project"),
        branch: BranchName::new(branch),
        session: SessionId::new(session),
    }
}

fn tool(name: &str, tool_input: Value) -> HookInput {
    HookInput {
        session_id: "s1".to_string(),
        tool_name: Some(name.to_string()),
        tool_input,
        ..HookInput::default()
    }
}

fn edit() -> HookInput {
    tool("Edit", json!({ "file_path": "src/lib.rs" }))
}

fn decision(response: Option<&Value>) -> Option<&str> {
    response?.pointer("/hookSpecificOutput/permissionDecision")?.as_str()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn pre_tool_use_denies_until_satisfied() {
    let services = services();
    let config = standard_config();
    let target = target("feature/x", "s1");

    let response = respond(HookEvent::PreToolUse, &edit(), &services, &config, &target);
    assert_eq!(decision(response.as_ref()), Some("deny"));
    let reason = response
        .as_ref()
        .and_then(|value| value.pointer("/hookSpecificOutput/permissionDecisionReason"))
        .and_then(Value::as_str)
        .expect("reason");
    assert!(reason.contains("req satisfy commit_plan"));

    operations::satisfy(
        &services,
        config.requirements(),
        &target,
        &[RequirementName::new("commit_plan")],
        &SatisfyRequest::default(),
    )
    .expect("satisfy");
    assert_eq!(respond(HookEvent::PreToolUse, &edit(), &services, &config, &target), None);

    let other = self::target("feature/x", "s2");
    let response = respond(HookEvent::PreToolUse, &edit(), &services, &config, &other);
    assert_eq!(decision(response.as_ref()), Some("deny"));
}

#[test]
fn command_patterns_gate_only_matching_commands() {
    let services = services();
    let config = standard_config();
    let target = target("feature/x", "s1");
    let status = tool("Bash", json!({ "command": "git status" }));
    assert_eq!(respond(HookEvent::PreToolUse, &status, &services, &config, &target), None);
    let commit = tool("Bash", json!({ "command": "git commit -m wip" }));
    let response = respond(HookEvent::PreToolUse, &commit, &services, &config, &target);
    assert_eq!(decision(response.as_ref()), Some("deny"));
}

#[test]
fn skill_completion_satisfies_mapped_requirement() {
    let services = services();
    let config = standard_config();
    let target = target("feature/x", "s1");
    let skill = tool("Skill", json!({ "skill": "commit-plan" }));
    assert_eq!(respond(HookEvent::PostToolUse, &skill, &services, &config, &target), None);
    assert_eq!(respond(HookEvent::PreToolUse, &edit(), &services, &config, &target), None);
}

#[test]
fn commit_clears_single_use_requirement() {
    let services = services();
    let config = standard_config();
    let target = target("feature/x", "s1");
    let name = RequirementName::new("pre_commit_review");
    operations::satisfy(&services, config.requirements(), &target, &[name.clone()], &SatisfyRequest::default())
        .expect("satisfy");
    let commit = tool("Bash", json!({ "command": "git commit -m wip" }));
    assert_eq!(respond(HookEvent::PreToolUse, &commit, &services, &config, &target), None);

    let _ = respond(HookEvent::PostToolUse, &commit, &services, &config, &target);
    let report = operations::status(&services, config.requirements(), &target);
    let entry = report.requirements.iter().find(|entry| entry.name == name).expect("entry");
    assert!(!entry.satisfied);
}

#[test]
fn stop_blocks_on_triggered_requirements_once() {
    let services = services();
    let config = standard_config();
    let target = target("feature/x", "s1");
    let quiet = tool("Read", json!({}));
    assert_eq!(respond(HookEvent::Stop, &quiet, &services, &config, &target), None);

    let _ = respond(HookEvent::PreToolUse, &edit(), &services, &config, &target);
    let response = respond(HookEvent::Stop, &quiet, &services, &config, &target).expect("block");
    assert_eq!(response["decision"], "block");
    assert!(response["reason"].as_str().is_some_and(|reason| reason.contains("req satisfy commit_plan")));

    let looping = HookInput {
        stop_hook_active: true,
        ..quiet
    };
    assert_eq!(respond(HookEvent::Stop, &looping, &services, &config, &target), None);
}

#[test]
fn stop_verification_can_be_disabled() {
    let services = services();
    let config = config(json!({
        "hooks": { "stop": { "verify_requirements": false } },
        "requirements": { "commit_plan": { "type": "blocking", "scope": "session" } }
    }));
    let target = target("feature/x", "s1");
    let _ = respond(HookEvent::PreToolUse, &edit(), &services, &config, &target);
    assert_eq!(respond(HookEvent::Stop, &edit(), &services, &config, &target), None);
}

#[test]
fn globally_disabled_configuration_allows_everything() {
    let services = services();
    let config = config(json!({
        "enabled": false,
        "requirements": { "commit_plan": { "type": "blocking", "scope": "session" } }
    }));
    let target = target("feature/x", "s1");
    assert_eq!(respond(HookEvent::PreToolUse, &edit(), &services, &config, &target), None);
    assert_eq!(respond(HookEvent::Stop, &edit(), &services, &config, &target), None);
}

#[test]
fn protected_branch_guard_denies_until_approved_for_session() {
    let services = services();
    let config = config(json!({
        "requirements": {
            "protected_branch": { "type": "guard", "scope": "session", "guard_type": "protected_branch" }
        }
    }));
    let main = target("main", "s1");
    let response = respond(HookEvent::PreToolUse, &edit(), &services, &config, &main);
    assert_eq!(decision(response.as_ref()), Some("deny"));

    operations::approve(&services, config.requirements(), &main, &RequirementName::new("protected_branch"), None)
        .expect("approve");
    assert_eq!(respond(HookEvent::PreToolUse, &edit(), &services, &config, &main), None);

    let fresh = target("main", "s2");
    let response = respond(HookEvent::PreToolUse, &edit(), &services, &config, &fresh);
    assert_eq!(decision(response.as_ref()), Some("deny"));
    let feature = target("feature/x", "s2");
    assert_eq!(respond(HookEvent::PreToolUse, &edit(), &services, &config, &feature), None);
}

#[test]
fn session_start_summarizes_and_session_end_forgets() {
    let services = services();
    let config = config(json!({
        "requirements": { "adr_reviewed": { "type": "blocking", "scope": "branch" } }
    }));
    let first = target("feature/x", "s1");
    let _ = respond(HookEvent::PreToolUse, &edit(), &services, &config, &first);

    let second = target("feature/x", "s2");
    let response = respond(HookEvent::SessionStart, &HookInput::default(), &services, &config, &second)
        .expect("summary");
    let context = response.pointer("/hookSpecificOutput/additionalContext").and_then(Value::as_str).expect("context");
    assert!(context.contains("adr_reviewed"));
    assert!(services.sessions.list().expect("list").iter().any(|record| record.session == second.session));

    let _ = respond(HookEvent::SessionEnd, &HookInput::default(), &services, &config, &second);
    assert!(!services.sessions.list().expect("list").iter().any(|record| record.session == second.session));
}

#[test]
fn blank_session_ids_get_no_opinion_and_leave_state_alone() {
    let services = services();
    let config = standard_config();
    for blank in ["", "   "] {
        let anonymous = target("feature/x", blank);
        assert_eq!(respond(HookEvent::SessionStart, &HookInput::default(), &services, &config, &anonymous), None);
        assert_eq!(respond(HookEvent::PreToolUse, &edit(), &services, &config, &anonymous), None);
        let skill = tool("Skill", json!({ "skill": "commit-plan" }));
        assert_eq!(respond(HookEvent::PostToolUse, &skill, &services, &config, &anonymous), None);
        assert_eq!(respond(HookEvent::Stop, &edit(), &services, &config, &anonymous), None);
    }
    assert!(services.sessions.list().expect("list").is_empty());
    assert!(services.store.list_branches().expect("branches").is_empty());

    let named = target("feature/x", "s1");
    let response = respond(HookEvent::PreToolUse, &edit(), &services, &config, &named);
    assert_eq!(decision(response.as_ref()), Some("deny"));
}
