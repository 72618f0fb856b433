// crates/requirement-gate-core/src/lib.rs
// ============================================================================
// Module: Requirement Gate Core Library
// Description: Public API surface for the Requirement Gate core.
// Purpose: Expose core types, interfaces, runtime, and telemetry.
// Dependencies: crate::{core, interfaces, runtime, telemetry}
// ============================================================================

//! ## Overview
//! Requirement Gate decides, for every attempted edit or command in an agent
//! session, whether configured workflow requirements are satisfied. It blocks
//! with an explanatory message when they are not and allows whenever it
//! cannot decide.
//!
//! Invariants:
//! - Pre-action checks return a [`CheckDecision`] and never fail.
//! - An unexpired branch-level satisfaction wins over session-level state.
//! - TTL expiry is evaluated lazily on read; sweeping is an explicit operation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BranchStateStore;
pub use interfaces::CacheError;
pub use interfaces::CacheRecord;
pub use interfaces::CalculatedValue;
pub use interfaces::CalculationContext;
pub use interfaces::Calculator;
pub use interfaces::CalculatorCatalog;
pub use interfaces::CalculatorError;
pub use interfaces::GuardCatalog;
pub use interfaces::GuardCondition;
pub use interfaces::GuardContext;
pub use interfaces::SessionRecord;
pub use interfaces::SessionRegistry;
pub use interfaces::StoreError;
pub use interfaces::TtlStore;
pub use runtime::CheckDecision;
pub use runtime::CheckSettings;
pub use runtime::CompletedAction;
pub use runtime::Denial;
pub use runtime::GateServices;
pub use runtime::OperationError;
pub use runtime::RequirementChecker;
pub use runtime::SessionContext;
pub use runtime::StateEngine;
pub use runtime::StatusReport;
pub use telemetry::EventLevel;
pub use telemetry::EventSink;
pub use telemetry::GateEvent;
