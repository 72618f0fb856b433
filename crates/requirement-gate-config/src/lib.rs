// crates/requirement-gate-config/src/lib.rs
// ============================================================================
// Module: Requirement Gate Config Library
// Description: Layered configuration loading and resolution.
// Purpose: Expose the typed configuration tree, merge, and resolver.
// Dependencies: crate::{document, effective, layer, resolve}
// ============================================================================

//! ## Overview
//! Configuration is read from a global, a project, and a project-local
//! document, merged with typed override semantics, and finalized into
//! requirement specs plus ambient settings. Resolution never fails; every
//! problem surfaces as a [`ConfigWarning`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod effective;
pub mod layer;
pub mod resolve;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::ConfigError;
pub use document::ConfigWarning;
pub use document::DocumentFormat;
pub use document::MAX_CONFIG_FILE_SIZE;
pub use effective::EffectiveConfig;
pub use effective::LogDestination;
pub use effective::LoggingSettings;
pub use effective::StopHookSettings;
pub use layer::ConfigLayer;
pub use layer::Merge;
pub use layer::RequirementLayer;
pub use resolve::ConfigSources;
pub use resolve::GLOBAL_CONFIG_ENV_VAR;
pub use resolve::ResolvedConfig;
pub use resolve::SKIP_ENV_VAR;
pub use resolve::merge_layers;
pub use resolve::resolve;
pub use resolve::resolve_sources;
pub use resolve::skip_requested;
