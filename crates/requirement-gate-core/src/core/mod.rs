// crates/requirement-gate-core/src/core/mod.rs
// ============================================================================
// Module: Requirement Gate Core Types
// Description: Requirement definitions, persisted state, identifiers, and time.
// Purpose: Provide stable, serializable types shared by every gate component.
// Dependencies: regex, serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Core types describe what a requirement is ([`spec`]), what has been
//! recorded about it on a branch ([`state`]), and the identifiers and clock
//! used to key and expire that state.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod spec;
pub mod state;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::composite_key;
pub use hashing::sha256_hex;
pub use identifiers::BranchName;
pub use identifiers::RequirementName;
pub use identifiers::SessionId;
pub use spec::ActionRequest;
pub use spec::CalculatorKind;
pub use spec::CommandPattern;
pub use spec::DEFAULT_BASE_BRANCH;
pub use spec::DEFAULT_CALCULATION_TTL_SECS;
pub use spec::DEFAULT_PROTECTED_BRANCHES;
pub use spec::DEFAULT_SESSION_STALE_SECS;
pub use spec::DEFAULT_SINGLE_USE_CLEAR_PATTERN;
pub use spec::DEFAULT_TRIGGER_TOOLS;
pub use spec::DynamicSpec;
pub use spec::GuardKind;
pub use spec::GuardSpec;
pub use spec::RequirementKind;
pub use spec::RequirementSpec;
pub use spec::RequirementType;
pub use spec::Scope;
pub use spec::Thresholds;
pub use spec::TriggerPredicate;
pub use spec::TriggerRule;
pub use state::BranchDocument;
pub use state::RequirementState;
pub use state::STATE_FORMAT_VERSION;
pub use state::SatisfactionEntry;
pub use state::SatisfactionMethod;
pub use state::SessionEntry;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
pub use time::Timestamp;
