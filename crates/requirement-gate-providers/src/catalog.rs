// crates/requirement-gate-providers/src/catalog.rs
// ============================================================================
// Module: Built-in Catalogs
// Description: Static tables of built-in calculators and guard conditions.
// Purpose: Resolve configured identifiers without runtime string dispatch.
// Dependencies: requirement-gate-core
// ============================================================================

//! ## Overview
//! Identifiers are parsed into [`CalculatorKind`] and [`GuardKind`] when the
//! configuration is finalized. The catalogs map each known variant to its
//! implementation; `Unknown` variants resolve to `None`, which the strategies
//! treat as a configuration error (calculators) or an allow (guards).

// ============================================================================
// SECTION: Imports
// ============================================================================

use requirement_gate_core::Calculator;
use requirement_gate_core::CalculatorCatalog;
use requirement_gate_core::CalculatorKind;
use requirement_gate_core::GuardCatalog;
use requirement_gate_core::GuardCondition;
use requirement_gate_core::GuardKind;

use crate::calculators::BranchSizeCalculator;
use crate::guards::ProtectedBranchGuard;
use crate::guards::SingleSessionGuard;

// ============================================================================
// SECTION: Catalogs
// ============================================================================

/// Built-in calculator table.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCalculators {
    /// Branch size calculator.
    branch_size: BranchSizeCalculator,
}

impl CalculatorCatalog for BuiltinCalculators {
    fn calculator(&self, kind: &CalculatorKind) -> Option<&dyn Calculator> {
        match kind {
            CalculatorKind::BranchSize => Some(&self.branch_size),
            CalculatorKind::Unknown(_) => None,
        }
    }
}

/// Built-in guard table.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinGuards {
    /// Protected branch guard.
    protected_branch: ProtectedBranchGuard,
    /// Single session per branch guard.
    single_session: SingleSessionGuard,
}

impl GuardCatalog for BuiltinGuards {
    fn guard(&self, kind: &GuardKind) -> Option<&dyn GuardCondition> {
        match kind {
            GuardKind::ProtectedBranch => Some(&self.protected_branch),
            GuardKind::SingleSessionPerBranch => Some(&self.single_session),
            GuardKind::Unknown(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
