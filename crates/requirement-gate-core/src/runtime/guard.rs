// crates/requirement-gate-core/src/runtime/guard.rs
// ============================================================================
// Module: Guard Strategy
// Description: Stateless boolean-condition requirements with session approval.
// Purpose: Gate actions on live context without persisting anything.
// Dependencies: crate::{core, interfaces, runtime, telemetry}
// ============================================================================

//! ## Overview
//! A guard requirement first honors a session-scoped approval, then asks the
//! guard catalog for its condition. Guard identifiers with no registered
//! condition allow the action and record a warning, so a new guard type never
//! blocks by accident.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RequirementKind;
use crate::core::RequirementSpec;
use crate::interfaces::GuardContext;
use crate::runtime::strategy::Denial;
use crate::runtime::strategy::EvaluationContext;
use crate::runtime::strategy::RequirementOutcome;
use crate::runtime::strategy::RequirementStrategy;
use crate::runtime::strategy::StrategyError;
use crate::runtime::strategy::compose_message;
use crate::runtime::strategy::remediation_for;
use crate::telemetry::EventLevel;
use crate::telemetry::GateEvent;

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Strategy for guard requirements.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardStrategy;

impl RequirementStrategy for GuardStrategy {
    fn check(&self, spec: &RequirementSpec, ctx: &EvaluationContext<'_>) -> Result<RequirementOutcome, StrategyError> {
        let RequirementKind::Guard(guard) = &spec.kind else {
            return Err(StrategyError::Invalid(format!("{} is not a guard requirement", spec.name)));
        };
        if ctx.engine.is_approved(&spec.name) {
            return Ok(RequirementOutcome::Satisfied);
        }
        let Some(condition) = ctx.services.guards.guard(&guard.guard) else {
            ctx.services.emit(
                &GateEvent::new("unknown_guard", EventLevel::Warn, ctx.engine.now())
                    .with_requirement(&spec.name)
                    .with_branch(&ctx.action.branch)
                    .with_session(&ctx.action.session)
                    .with_message(format!("no guard condition registered for `{}`; allowing", guard.guard.as_str())),
            );
            return Ok(RequirementOutcome::Satisfied);
        };
        let guard_ctx = GuardContext {
            project: &ctx.action.project,
            branch: &ctx.action.branch,
            session: &ctx.action.session,
            spec: guard,
            sessions: &*ctx.services.sessions,
            now: ctx.engine.now(),
        };
        if condition.evaluate(&guard_ctx) {
            return Ok(RequirementOutcome::Satisfied);
        }
        let headline = format!("Requirement `{}` blocked this action: {}", spec.name, condition.denial_reason(&guard_ctx));
        Ok(RequirementOutcome::Denied(Denial {
            requirement: spec.name.clone(),
            requirement_type: spec.requirement_type(),
            scope: spec.scope,
            message: compose_message(spec, &headline),
            full: true,
            remediation: remediation_for(spec),
        }))
    }
}
