// crates/requirement-gate-providers/src/calculators.rs
// ============================================================================
// Module: Built-in Calculators
// Description: Measurements backing dynamic requirements.
// Purpose: Implement the calculator contract for branch diff size.
// Dependencies: requirement-gate-core, crate::git
// ============================================================================

//! ## Overview
//! [`BranchSizeCalculator`] measures lines added plus deleted between the
//! merge base with the configured base branch and the current work tree,
//! so uncommitted edits count toward the total.

// ============================================================================
// SECTION: Imports
// ============================================================================

use requirement_gate_core::CalculatedValue;
use requirement_gate_core::CalculationContext;
use requirement_gate_core::Calculator;
use requirement_gate_core::CalculatorError;

use crate::git::GitFacts;

// ============================================================================
// SECTION: Branch Size
// ============================================================================

/// Lines changed on the current branch relative to its base.
#[derive(Debug, Default, Clone, Copy)]
pub struct BranchSizeCalculator;

impl Calculator for BranchSizeCalculator {
    fn compute(&self, ctx: &CalculationContext<'_>) -> Result<CalculatedValue, CalculatorError> {
        let stat = GitFacts::at(ctx.project)
            .diff_against(ctx.base_branch)
            .map_err(|err| CalculatorError::Vcs(err.to_string()))?;
        let total = stat.total();
        #[allow(clippy::cast_precision_loss, reason = "Line counts stay far below f64 precision limits.")]
        let value = total as f64;
        Ok(CalculatedValue {
            value,
            detail: Some(format!(
                "{total} lines changed (+{} -{}) across {} files vs {}",
                stat.added, stat.deleted, stat.files, ctx.base_branch
            )),
        })
    }
}
