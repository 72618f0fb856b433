// crates/requirement-gate-core/src/runtime/blocking.rs
// ============================================================================
// Module: Blocking Strategy
// Description: Manual-satisfaction requirements with denial deduplication.
// Purpose: Deny until the requirement is explicitly satisfied.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! A blocking requirement is satisfied exactly when the state engine says so.
//! Denials pass through the dedup cache: the first denial inside a window
//! carries the full message and later ones a short placeholder.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RequirementSpec;
use crate::runtime::strategy::Denial;
use crate::runtime::strategy::EvaluationContext;
use crate::runtime::strategy::RequirementOutcome;
use crate::runtime::strategy::RequirementStrategy;
use crate::runtime::strategy::StrategyError;
use crate::runtime::strategy::compose_message;
use crate::runtime::strategy::remediation_for;

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Strategy for blocking requirements.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingStrategy;

impl RequirementStrategy for BlockingStrategy {
    fn check(&self, spec: &RequirementSpec, ctx: &EvaluationContext<'_>) -> Result<RequirementOutcome, StrategyError> {
        if ctx.engine.is_satisfied(&spec.name, spec.scope) {
            return Ok(RequirementOutcome::Satisfied);
        }
        let headline = format!("Requirement `{}` is not satisfied ({} scope).", spec.name, spec.scope);
        let message = compose_message(spec, &headline);
        let key = ctx.dedup_key(&spec.name, "deny");
        let full = ctx.services.dedup.should_show_full_message(&key, &message, ctx.dedup_ttl_secs);
        let message = if full {
            message
        } else {
            format!("Requirement `{}` is still not satisfied (details were just shown).", spec.name)
        };
        Ok(RequirementOutcome::Denied(Denial {
            requirement: spec.name.clone(),
            requirement_type: spec.requirement_type(),
            scope: spec.scope,
            message,
            full,
            remediation: remediation_for(spec),
        }))
    }
}
