// crates/requirement-gate-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Session Lifecycle Hooks
// Description: Session start, post-action, stop, and end integration points.
// Purpose: Keep requirement state in step with the host session lifecycle.
// Dependencies: crate::{core, runtime, telemetry}, serde
// ============================================================================

//! ## Overview
//! Each function here backs one host lifecycle event. None of them fails:
//! state writes degrade through the state engine and registry updates are
//! logged on failure.
//!
//! - session start: refresh the session registry and summarize state.
//! - post action: auto-satisfy on skill completion, clear single-use state on
//!   matching commands.
//! - stop: list triggered but unsatisfied blocking requirements.
//! - session end: drop the session's entries in one write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::CommandPattern;
use crate::core::RequirementName;
use crate::core::RequirementSpec;
use crate::core::RequirementType;
use crate::core::SatisfactionMethod;
use crate::core::Scope;
use crate::runtime::operations::SessionContext;
use crate::runtime::operations::StatusReport;
use crate::runtime::operations::status;
use crate::runtime::services::GateServices;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Completed host action reported after it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedAction {
    /// A named skill finished.
    Skill {
        /// Skill name.
        name: String,
    },
    /// A shell command finished.
    Command {
        /// Command text.
        text: String,
    },
    /// Any other tool finished.
    Tool {
        /// Tool name.
        kind: String,
    },
}

/// Changes made by a post-action notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostActionReport {
    /// Requirements satisfied by a completed skill.
    pub satisfied: Vec<RequirementName>,
    /// Single-use requirements cleared by a completed command.
    pub cleared: Vec<RequirementName>,
}

/// Requirement reported by the stop verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequirement {
    /// Requirement scope.
    pub scope: Scope,
    /// Requirement name.
    pub name: RequirementName,
}

// ============================================================================
// SECTION: Lifecycle Hooks
// ============================================================================

/// Handles session start: registers the session and summarizes its state.
#[must_use]
pub fn session_start(services: &GateServices, requirements: &[RequirementSpec], target: &SessionContext) -> StatusReport {
    services.touch_session(&target.project, &target.branch, &target.session);
    status(services, requirements, target)
}

/// Handles a completed action.
#[must_use]
pub fn post_action(
    services: &GateServices,
    requirements: &[RequirementSpec],
    target: &SessionContext,
    action: &CompletedAction,
) -> PostActionReport {
    let engine = services.engine(&target.branch, &target.session);
    let mut report = PostActionReport::default();
    match action {
        CompletedAction::Skill {
            name,
        } => {
            for spec in requirements.iter().filter(|spec| spec.enabled && spec.satisfied_by_skills.contains(name)) {
                let mut metadata = serde_json::Map::new();
                metadata.insert("skill".to_string(), serde_json::Value::String(name.clone()));
                if spec.is_approvable() {
                    engine.approve(&spec.name, None);
                } else {
                    engine.satisfy(&spec.name, spec.scope, SatisfactionMethod::Skill, Some(metadata), None);
                }
                report.satisfied.push(spec.name.clone());
            }
        }
        CompletedAction::Command {
            text,
        } => {
            for spec in requirements
                .iter()
                .filter(|spec| spec.enabled && spec.scope == Scope::SingleUse && clears_on(&spec.clear_on, text))
            {
                engine.clear(&spec.name, Scope::SingleUse);
                report.cleared.push(spec.name.clone());
            }
        }
        CompletedAction::Tool {
            ..
        } => {}
    }
    report
}

/// Lists triggered but unsatisfied blocking requirements whose scope is in `scopes`.
///
/// Dynamic and guard requirements are evaluated live and never reported here.
#[must_use]
pub fn session_stop(
    services: &GateServices,
    requirements: &[RequirementSpec],
    target: &SessionContext,
    scopes: &[Scope],
) -> Vec<PendingRequirement> {
    let engine = services.engine(&target.branch, &target.session);
    let document = engine.document();
    let now = engine.now();
    requirements
        .iter()
        .filter(|spec| {
            spec.enabled && spec.requirement_type() == RequirementType::Blocking && scopes.contains(&spec.scope)
        })
        .filter(|spec| {
            document.requirement(&spec.name).is_some_and(|state| {
                state.is_triggered(spec.scope, &target.session) && !state.is_satisfied(spec.scope, &target.session, now)
            })
        })
        .map(|spec| PendingRequirement {
            scope: spec.scope,
            name: spec.name.clone(),
        })
        .collect()
}

/// Handles session end: removes the session's entries and registry record.
///
/// Branch-level state is untouched.
pub fn session_end(services: &GateServices, target: &SessionContext) {
    services.engine(&target.branch, &target.session).remove_session();
    services.forget_session(&target.session);
}

/// Returns true when any clearing pattern matches the command.
fn clears_on(patterns: &[CommandPattern], command: &str) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(command))
}
