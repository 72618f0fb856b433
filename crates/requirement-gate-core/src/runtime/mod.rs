// crates/requirement-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Requirement Gate Runtime
// Description: State engine, strategies, checker, lifecycle hooks, and operations.
// Purpose: Evaluate requirements against live actions and manage their state.
// Dependencies: crate::{core, interfaces, telemetry}
// ============================================================================

//! ## Overview
//! The runtime wires core types to the interface traits. Evaluation flows
//! from [`RequirementChecker`] through [`strategy_for`] into the per-type
//! strategies, which read state through [`StateEngine`] and values through
//! the caches.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod blocking;
pub mod cache;
pub mod checker;
pub mod dynamic;
pub mod engine;
pub mod guard;
pub mod lifecycle;
pub mod operations;
pub mod services;
pub mod store;
pub mod strategy;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use blocking::BlockingStrategy;
pub use cache::CalculationCache;
pub use cache::DEFAULT_DEDUP_TTL_SECS;
pub use cache::DedupCache;
pub use checker::CheckDecision;
pub use checker::CheckSettings;
pub use checker::RequirementChecker;
pub use dynamic::DynamicStrategy;
pub use engine::StateEngine;
pub use guard::GuardStrategy;
pub use lifecycle::CompletedAction;
pub use lifecycle::PendingRequirement;
pub use lifecycle::PostActionReport;
pub use lifecycle::post_action;
pub use lifecycle::session_end;
pub use lifecycle::session_start;
pub use lifecycle::session_stop;
pub use operations::OperationError;
pub use operations::PruneReport;
pub use operations::SatisfyOutcome;
pub use operations::SatisfyRequest;
pub use operations::SessionContext;
pub use operations::StatusEntry;
pub use operations::StatusReport;
pub use services::GateServices;
pub use store::InMemoryBranchStateStore;
pub use store::InMemorySessionRegistry;
pub use store::InMemoryTtlStore;
pub use strategy::Denial;
pub use strategy::EvaluationContext;
pub use strategy::RequirementOutcome;
pub use strategy::RequirementStrategy;
pub use strategy::StrategyError;
pub use strategy::strategy_for;
