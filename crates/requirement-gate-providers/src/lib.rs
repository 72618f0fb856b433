// crates/requirement-gate-providers/src/lib.rs
// ============================================================================
// Module: Requirement Gate Providers Library
// Description: Version control facts and built-in evaluators.
// Purpose: Expose git queries, calculators, guards, and their catalogs.
// Dependencies: requirement-gate-core
// ============================================================================

//! ## Overview
//! Providers connect the gate to the outside world: the git work tree it runs
//! in, the measurements dynamic requirements compare against thresholds, and
//! the conditions guard requirements evaluate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod calculators;
pub mod catalog;
pub mod git;
pub mod guards;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use calculators::BranchSizeCalculator;
pub use catalog::BuiltinCalculators;
pub use catalog::BuiltinGuards;
pub use git::DiffStat;
pub use git::GitFacts;
pub use git::STATE_DIR_NAME;
pub use git::VcsError;
pub use guards::ProtectedBranchGuard;
pub use guards::SingleSessionGuard;
