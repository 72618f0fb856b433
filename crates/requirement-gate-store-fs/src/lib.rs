// crates/requirement-gate-store-fs/src/lib.rs
// ============================================================================
// Module: Requirement Gate Filesystem Store Library
// Description: File-backed implementations of the gate's store interfaces.
// Purpose: Persist branch state, caches, and the session registry on disk.
// Dependencies: requirement-gate-core, fs2, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Every store in this crate shares one discipline: shared locks for reads,
//! exclusive locks for read-modify-write, and atomic temp-file replacement
//! for writes. Locks are advisory sidecar files so cooperating processes
//! (several hook invocations at once) serialize without a daemon.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod branch_store;
mod file;
pub mod sessions;
pub mod ttl_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use branch_store::FsBranchStateStore;
pub use branch_store::MAX_STATE_BYTES;
pub use sessions::FileSessionRegistry;
pub use sessions::default_registry_path;
pub use ttl_store::CALCULATION_CACHE_FILE;
pub use ttl_store::DEDUP_CACHE_FILE;
pub use ttl_store::FileTtlStore;
pub use ttl_store::default_cache_dir;
