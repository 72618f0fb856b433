// crates/requirement-gate-core/src/runtime/strategy.rs
// ============================================================================
// Module: Requirement Evaluation Strategies
// Description: Strategy contract, outcomes, denials, and the static dispatch table.
// Purpose: Route each requirement type to one stateless, reusable evaluator.
// Dependencies: crate::{core, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! Every requirement type maps to exactly one strategy instance through
//! [`strategy_for`]. Strategies are unit structs with no state of their own;
//! everything they read comes through [`EvaluationContext`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::ActionRequest;
use crate::core::RequirementName;
use crate::core::RequirementSpec;
use crate::core::RequirementType;
use crate::core::Scope;
use crate::runtime::blocking::BlockingStrategy;
use crate::runtime::dynamic::DynamicStrategy;
use crate::runtime::engine::StateEngine;
use crate::runtime::guard::GuardStrategy;
use crate::runtime::services::GateServices;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Structured denial for one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    /// Requirement that blocked the action.
    pub requirement: RequirementName,
    /// Requirement type.
    pub requirement_type: RequirementType,
    /// Requirement scope.
    pub scope: Scope,
    /// Human-readable explanation.
    pub message: String,
    /// False when the message is the short placeholder used inside the dedup window.
    pub full: bool,
    /// Command that resolves this denial.
    pub remediation: String,
}

/// Result of evaluating one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementOutcome {
    /// The action may proceed.
    Satisfied,
    /// The action may proceed; the notice is shown to the agent.
    Warned(String),
    /// The action is blocked.
    Denied(Denial),
}

/// Strategy evaluation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Requirement references a calculator that is not registered.
    #[error("unknown calculator: {0}")]
    UnknownCalculator(String),
    /// Calculator failed to produce a value.
    #[error("calculation failed: {0}")]
    Calculation(String),
    /// Requirement attributes do not match its strategy.
    #[error("invalid requirement: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Everything a strategy may consult while evaluating one action.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Action under evaluation.
    pub action: &'a ActionRequest,
    /// State engine bound to the action's branch and session.
    pub engine: &'a StateEngine,
    /// Shared service handles.
    pub services: &'a GateServices,
    /// Dedup window for repeated denials and notices (seconds).
    pub dedup_ttl_secs: u64,
}

impl EvaluationContext<'_> {
    /// Returns the dedup key for a requirement in this context.
    #[must_use]
    pub fn dedup_key(&self, requirement: &RequirementName, suffix: &str) -> String {
        let project = self.action.project.to_string_lossy();
        crate::core::composite_key(&[
            &*project,
            self.action.branch.as_str(),
            self.action.session.as_str(),
            requirement.as_str(),
            suffix,
        ])
    }
}

// ============================================================================
// SECTION: Strategy Contract
// ============================================================================

/// Evaluator for one requirement type.
pub trait RequirementStrategy: Send + Sync {
    /// Evaluates `spec` for the action in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] when evaluation cannot complete.
    fn check(&self, spec: &RequirementSpec, ctx: &EvaluationContext<'_>) -> Result<RequirementOutcome, StrategyError>;
}

/// Shared blocking strategy instance.
static BLOCKING: BlockingStrategy = BlockingStrategy;
/// Shared dynamic strategy instance.
static DYNAMIC: DynamicStrategy = DynamicStrategy;
/// Shared guard strategy instance.
static GUARD: GuardStrategy = GuardStrategy;

/// Returns the strategy registered for a requirement type.
#[must_use]
pub fn strategy_for(requirement_type: RequirementType) -> &'static dyn RequirementStrategy {
    match requirement_type {
        RequirementType::Blocking => &BLOCKING,
        RequirementType::Dynamic => &DYNAMIC,
        RequirementType::Guard => &GUARD,
    }
}

// ============================================================================
// SECTION: Message Helpers
// ============================================================================

/// Returns the remediation command for a requirement.
#[must_use]
pub fn remediation_for(spec: &RequirementSpec) -> String {
    if spec.is_approvable() {
        format!("req approve {}", spec.name)
    } else {
        format!("req satisfy {}", spec.name)
    }
}

/// Builds the full denial text from a headline and the configured message.
#[must_use]
pub fn compose_message(spec: &RequirementSpec, headline: &str) -> String {
    let mut message = String::from(headline);
    if let Some(text) = spec.message.as_deref().map(str::trim).filter(|text| !text.is_empty()) {
        message.push_str("\n\n");
        message.push_str(text);
    }
    if !spec.checklist.is_empty() {
        message.push_str("\n\nChecklist:");
        for item in &spec.checklist {
            message.push_str("\n  - ");
            message.push_str(item);
        }
    }
    message
}
