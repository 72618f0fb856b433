// crates/requirement-gate-core/src/runtime/checker.rs
// ============================================================================
// Module: Requirement Checker
// Description: Pre-action check boundary aggregating strategy outcomes.
// Purpose: Decide allow or deny for an attempted action without ever failing.
// Dependencies: crate::{core, runtime, telemetry}, serde, serde_json
// ============================================================================

//! ## Overview
//! [`RequirementChecker::check`] is the primary integration point. It marks
//! every enabled, trigger-matching requirement as triggered, dispatches it to
//! its strategy, and folds all denials into one [`CheckDecision`].
//!
//! The decision type has no failure variant. A requirement whose strategy
//! fails is logged at error level and counts as satisfied for that check;
//! denials from the remaining requirements are still aggregated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::json;

use crate::core::ActionRequest;
use crate::core::RequirementSpec;
use crate::runtime::cache::DEFAULT_DEDUP_TTL_SECS;
use crate::runtime::services::GateServices;
use crate::runtime::strategy::Denial;
use crate::runtime::strategy::EvaluationContext;
use crate::runtime::strategy::RequirementOutcome;
use crate::runtime::strategy::StrategyError;
use crate::runtime::strategy::strategy_for;
use crate::telemetry::EventLevel;
use crate::telemetry::GateEvent;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Outcome of a pre-action check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CheckDecision {
    /// The action may proceed.
    Allow {
        /// Non-blocking notices to show the agent.
        notices: Vec<String>,
    },
    /// The action is blocked.
    Deny {
        /// Aggregated human-readable explanation.
        message: String,
        /// Individual denials.
        denials: Vec<Denial>,
        /// Command string resolving every denial.
        remediation: String,
        /// Non-blocking notices collected alongside the denials.
        notices: Vec<String>,
    },
}

impl CheckDecision {
    /// Returns an allow decision with no notices.
    #[must_use]
    pub const fn allow() -> Self {
        Self::Allow {
            notices: Vec::new(),
        }
    }

    /// Returns true when the action may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Returns the denials carried by the decision.
    #[must_use]
    pub fn denials(&self) -> &[Denial] {
        match self {
            Self::Allow { .. } => &[],
            Self::Deny {
                denials, ..
            } => denials,
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Checker settings derived from the effective configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSettings {
    /// Global enforcement switch.
    pub enabled: bool,
    /// Dedup window for repeated denials (seconds).
    pub dedup_ttl_secs: u64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dedup_ttl_secs: DEFAULT_DEDUP_TTL_SECS,
        }
    }
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Pre-action check over a resolved requirement set.
pub struct RequirementChecker<'a> {
    /// Shared handles.
    services: &'a GateServices,
    /// Requirements from the effective configuration.
    requirements: &'a [RequirementSpec],
    /// Checker settings.
    settings: CheckSettings,
}

impl<'a> RequirementChecker<'a> {
    /// Creates a checker.
    #[must_use]
    pub const fn new(services: &'a GateServices, requirements: &'a [RequirementSpec], settings: CheckSettings) -> Self {
        Self {
            services,
            requirements,
            settings,
        }
    }

    /// Checks an attempted action. Never fails.
    ///
    /// A requirement whose strategy errors is treated as satisfied for this
    /// check only; every other matching requirement is still evaluated.
    #[must_use]
    pub fn check(&self, action: &ActionRequest) -> CheckDecision {
        if !self.settings.enabled {
            return CheckDecision::allow();
        }
        self.services.touch_session(&action.project, &action.branch, &action.session);
        let engine = self.services.engine(&action.branch, &action.session);
        let ctx = EvaluationContext {
            action,
            engine: &engine,
            services: self.services,
            dedup_ttl_secs: self.settings.dedup_ttl_secs,
        };

        let mut denials = Vec::new();
        let mut notices = Vec::new();
        for spec in self.requirements.iter().filter(|spec| spec.enabled && spec.trigger.matches(action)) {
            engine.mark_triggered(&spec.name, spec.scope);
            match self.evaluate(spec, &ctx) {
                RequirementOutcome::Satisfied => {}
                RequirementOutcome::Warned(notice) => notices.push(notice),
                RequirementOutcome::Denied(denial) => denials.push(denial),
            }
        }

        if denials.is_empty() {
            return CheckDecision::Allow {
                notices,
            };
        }
        let remediation = aggregate_remediation(&denials);
        let message = aggregate_message(&denials, &remediation);
        CheckDecision::Deny {
            message,
            denials,
            remediation,
            notices,
        }
    }

    /// Evaluates one requirement, mapping a strategy error to satisfied.
    fn evaluate(&self, spec: &RequirementSpec, ctx: &EvaluationContext<'_>) -> RequirementOutcome {
        match strategy_for(spec.requirement_type()).check(spec, ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record_failure(spec, ctx.action, &err);
                RequirementOutcome::Satisfied
            }
        }
    }

    /// Records a requirement that could not be evaluated.
    fn record_failure(&self, spec: &RequirementSpec, action: &ActionRequest, err: &StrategyError) {
        self.services.emit(
            &GateEvent::new("requirement_check_failed", EventLevel::Error, self.services.clock.now())
                .with_branch(&action.branch)
                .with_session(&action.session)
                .with_requirement(&spec.name)
                .with_message(err.to_string())
                .with_detail(json!({ "action": action.kind, "decision": "allow" })),
        );
    }
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Combines per-requirement remediation into one command string.
///
/// Blocking requirements share one `req satisfy` call; approvals are chained.
#[must_use]
pub fn aggregate_remediation(denials: &[Denial]) -> String {
    let mut to_satisfy = Vec::new();
    let mut commands = Vec::new();
    for denial in denials {
        if denial.remediation.starts_with("req satisfy ") {
            to_satisfy.push(denial.requirement.as_str());
        } else {
            commands.push(denial.remediation.clone());
        }
    }
    if !to_satisfy.is_empty() {
        commands.insert(0, format!("req satisfy {}", to_satisfy.join(" ")));
    }
    commands.join(" && ")
}

/// Builds the aggregated denial message.
fn aggregate_message(denials: &[Denial], remediation: &str) -> String {
    let count = denials.len();
    let noun = if count == 1 { "requirement" } else { "requirements" };
    let body = denials.iter().map(|denial| denial.message.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("Blocked by {count} unsatisfied {noun}.\n\n{body}\n\nTo continue, run: {remediation}")
}
