// crates/requirement-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Requirement Gate Interfaces
// Description: Backend-agnostic interfaces for state, caches, sessions, and evaluators.
// Purpose: Define the contract surfaces the gate runtime depends on.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces let the runtime stay independent of the filesystem, version
//! control, and host process. Stores are handed to the runtime by handle;
//! there are no process-wide singletons. Calculators and guard conditions
//! are looked up through closed catalogs keyed by [`CalculatorKind`] and
//! [`GuardKind`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::BranchDocument;
use crate::core::BranchName;
use crate::core::CalculatorKind;
use crate::core::GuardKind;
use crate::core::GuardSpec;
use crate::core::SessionId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Branch State Store
// ============================================================================

/// Branch state store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("branch state store io error: {0}")]
    Io(String),
    /// Stored document could not be parsed.
    #[error("branch state store corruption: {0}")]
    Corrupt(String),
    /// Stored document uses an unknown format version.
    #[error("branch state store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("branch state store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("branch state store error: {0}")]
    Store(String),
}

/// Persisted store of branch documents for a single project.
///
/// # Invariants
/// - `load` never observes a partially written document.
/// - `update` runs its mutation under exclusive access and persists the
///   result with at most one write.
pub trait BranchStateStore: Send + Sync {
    /// Loads the document for a branch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document exists but cannot be read or parsed.
    fn load(&self, branch: &BranchName) -> Result<Option<BranchDocument>, StoreError>;

    /// Applies `mutate` to the branch document and persists the result.
    ///
    /// An absent or unreadable document is replaced by an empty one before
    /// the mutation runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the result cannot be persisted.
    fn update(
        &self,
        branch: &BranchName,
        mutate: &mut dyn FnMut(&mut BranchDocument),
    ) -> Result<BranchDocument, StoreError>;

    /// Lists branches that have a persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be enumerated.
    fn list_branches(&self) -> Result<Vec<BranchName>, StoreError>;

    /// Removes the document for a branch. Returns true when one existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when removal fails.
    fn remove(&self, branch: &BranchName) -> Result<bool, StoreError>;
}

// ============================================================================
// SECTION: TTL Key-Value Store
// ============================================================================

/// Cache store errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache I/O error.
    #[error("cache io error: {0}")]
    Io(String),
    /// Cache file could not be parsed.
    #[error("cache corruption: {0}")]
    Corrupt(String),
    /// Cache backend reported an error.
    #[error("cache error: {0}")]
    Store(String),
}

/// One cached value with its write time and lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Cached payload.
    pub value: Value,
    /// When the record was written.
    pub stored_at: Timestamp,
    /// Lifetime in seconds.
    pub ttl_secs: u64,
}

impl CacheRecord {
    /// Returns true when the record is still within its lifetime at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        !self.stored_at.is_expired(Some(self.ttl_secs), now)
    }
}

/// Small shared key-value store with per-record TTLs.
///
/// Implementations may purge expired records whenever they write.
pub trait TtlStore: Send + Sync {
    /// Reads a record without checking freshness.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<CacheRecord>, CacheError>;

    /// Runs `decide` under exclusive access and stores the record it returns.
    ///
    /// `decide` receives the current record (if any); returning `None` leaves
    /// the store untouched. `now` is used to purge expired records.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backing store cannot be read or written.
    fn update(
        &self,
        key: &str,
        now: Timestamp,
        decide: &mut dyn FnMut(Option<&CacheRecord>) -> Option<CacheRecord>,
    ) -> Result<(), CacheError>;
}

// ============================================================================
// SECTION: Session Registry
// ============================================================================

/// Last known activity of a host session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier.
    pub session: SessionId,
    /// Project root the session works in.
    pub project: PathBuf,
    /// Branch the session was last seen on.
    pub branch: BranchName,
    /// Last activity timestamp.
    pub last_seen: Timestamp,
}

/// Registry of recently active sessions shared across projects.
pub trait SessionRegistry: Send + Sync {
    /// Inserts or refreshes a session record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the registry cannot be written.
    fn touch(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Removes a session record. Returns true when one existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the registry cannot be written.
    fn remove(&self, session: &SessionId) -> Result<bool, StoreError>;

    /// Lists every known session record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the registry cannot be read.
    fn list(&self) -> Result<Vec<SessionRecord>, StoreError>;
}

// ============================================================================
// SECTION: Calculators
// ============================================================================

/// Inputs available to a calculator.
#[derive(Debug, Clone, Copy)]
pub struct CalculationContext<'a> {
    /// Project root directory.
    pub project: &'a Path,
    /// Branch being measured.
    pub branch: &'a BranchName,
    /// Base branch for diff-based measurements.
    pub base_branch: &'a str,
}

/// Result of a calculator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedValue {
    /// Measured value compared against thresholds.
    pub value: f64,
    /// Optional human-readable breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Calculator errors.
#[derive(Debug, Error)]
pub enum CalculatorError {
    /// Version control query failed.
    #[error("calculator version control error: {0}")]
    Vcs(String),
    /// Calculator could not produce a value.
    #[error("calculator failed: {0}")]
    Failed(String),
}

/// Computes a numeric measurement for a dynamic requirement.
pub trait Calculator: Send + Sync {
    /// Computes the measurement.
    ///
    /// # Errors
    ///
    /// Returns [`CalculatorError`] when the value cannot be computed.
    fn compute(&self, ctx: &CalculationContext<'_>) -> Result<CalculatedValue, CalculatorError>;
}

/// Static table of calculators keyed by [`CalculatorKind`].
pub trait CalculatorCatalog: Send + Sync {
    /// Returns the calculator for `kind`, or `None` when none is registered.
    fn calculator(&self, kind: &CalculatorKind) -> Option<&dyn Calculator>;
}

// ============================================================================
// SECTION: Guard Conditions
// ============================================================================

/// Live context handed to guard conditions.
#[derive(Clone, Copy)]
pub struct GuardContext<'a> {
    /// Project root directory.
    pub project: &'a Path,
    /// Current branch.
    pub branch: &'a BranchName,
    /// Current session.
    pub session: &'a SessionId,
    /// Guard attributes from configuration.
    pub spec: &'a GuardSpec,
    /// Read-only view of active sessions.
    pub sessions: &'a dyn SessionRegistry,
    /// Evaluation time.
    pub now: Timestamp,
}

/// Stateless boolean condition evaluated against live context.
///
/// # Invariants
/// - Implementations perform no writes and no network calls.
pub trait GuardCondition: Send + Sync {
    /// Returns true when the action may proceed.
    fn evaluate(&self, ctx: &GuardContext<'_>) -> bool;

    /// Explains why the condition blocked the action.
    fn denial_reason(&self, ctx: &GuardContext<'_>) -> String;
}

/// Static table of guard conditions keyed by [`GuardKind`].
pub trait GuardCatalog: Send + Sync {
    /// Returns the condition for `kind`, or `None` when none is registered.
    fn guard(&self, kind: &GuardKind) -> Option<&dyn GuardCondition>;
}
