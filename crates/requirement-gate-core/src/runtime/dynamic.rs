// crates/requirement-gate-core/src/runtime/dynamic.rs
// ============================================================================
// Module: Dynamic Strategy
// Description: Computed-value requirements with warn and block thresholds.
// Purpose: Gate actions on cached measurements, overridable per session.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! A dynamic requirement asks its calculator for a value (through the
//! calculation cache) and compares it with `>=` against the block and warn
//! thresholds. A session-scoped approval skips the calculation entirely.
//! Values in the warn band allow the action with a deduplicated notice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RequirementKind;
use crate::core::RequirementSpec;
use crate::core::composite_key;
use crate::interfaces::CalculationContext;
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

/// Strategy for dynamic requirements.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicStrategy;

impl RequirementStrategy for DynamicStrategy {
    fn check(&self, spec: &RequirementSpec, ctx: &EvaluationContext<'_>) -> Result<RequirementOutcome, StrategyError> {
        let RequirementKind::Dynamic(dynamic) = &spec.kind else {
            return Err(StrategyError::Invalid(format!("{} is not a dynamic requirement", spec.name)));
        };
        if ctx.engine.is_approved(&spec.name) {
            return Ok(RequirementOutcome::Satisfied);
        }
        let calculator = ctx
            .services
            .calculators
            .calculator(&dynamic.calculator)
            .ok_or_else(|| StrategyError::UnknownCalculator(dynamic.calculator.as_str().to_string()))?;
        let calculation = CalculationContext {
            project: &ctx.action.project,
            branch: &ctx.action.branch,
            base_branch: &dynamic.base_branch,
        };
        let project = ctx.action.project.to_string_lossy();
        let key = composite_key(&[
            &*project,
            ctx.action.branch.as_str(),
            dynamic.calculator.as_str(),
            dynamic.base_branch.as_str(),
        ]);
        let measured = ctx
            .services
            .calculations
            .get_or_compute(&key, dynamic.cache_ttl, || calculator.compute(&calculation))
            .map_err(|err| StrategyError::Calculation(err.to_string()))?;
        let detail = measured.detail.as_deref().map(|detail| format!(" ({detail})")).unwrap_or_default();

        if measured.value >= dynamic.thresholds.block {
            let headline = format!(
                "Requirement `{}` exceeded its limit: {} measured{detail}, block threshold {}.",
                spec.name, measured.value, dynamic.thresholds.block
            );
            return Ok(RequirementOutcome::Denied(Denial {
                requirement: spec.name.clone(),
                requirement_type: spec.requirement_type(),
                scope: spec.scope,
                message: compose_message(spec, &headline),
                full: true,
                remediation: remediation_for(spec),
            }));
        }
        if let Some(warn) = dynamic.thresholds.warn
            && measured.value >= warn
        {
            let notice = format!(
                "Requirement `{}` is approaching its limit: {} measured{detail}, warn threshold {warn}, block threshold {}.",
                spec.name, measured.value, dynamic.thresholds.block
            );
            let key = ctx.dedup_key(&spec.name, "warn");
            if ctx.services.dedup.should_show_full_message(&key, &notice, ctx.dedup_ttl_secs) {
                return Ok(RequirementOutcome::Warned(notice));
            }
        }
        Ok(RequirementOutcome::Satisfied)
    }
}
