// crates/requirement-gate-core/src/runtime/operations.rs
// ============================================================================
// Module: Requirement Operations
// Description: Explicit user operations: satisfy, clear, approve, status, prune.
// Purpose: Back the command-line surface with actionable, typed errors.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Unlike the pre-action check, these operations are explicit user commands
//! and may fail with clear errors (for example an unknown requirement name).
//! State writes still go through the [`StateEngine`](crate::runtime::StateEngine)
//! and inherit its fail-open persistence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::BranchName;
use crate::core::RequirementKind;
use crate::core::RequirementName;
use crate::core::RequirementSpec;
use crate::core::RequirementState;
use crate::core::RequirementType;
use crate::core::SatisfactionEntry;
use crate::core::SatisfactionMethod;
use crate::core::Scope;
use crate::core::SessionId;
use crate::core::Timestamp;
use crate::runtime::services::GateServices;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by explicit operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Requirement name is not defined in the effective configuration.
    #[error("unknown requirement: {0}")]
    UnknownRequirement(String),
    /// Requirement type does not accept approvals.
    #[error("requirement {0} is a blocking requirement; use satisfy instead of approve")]
    NotApprovable(String),
    /// Operation was called without any requirement names.
    #[error("no requirement names given")]
    NoRequirements,
    /// Backing store failed.
    #[error("state store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Targets and Requests
// ============================================================================

/// Project, branch, and session an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    /// Project root.
    pub project: PathBuf,
    /// Current branch.
    pub branch: BranchName,
    /// Current session.
    pub session: SessionId,
}

/// Optional parameters of a satisfy call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SatisfyRequest {
    /// Scope override; defaults to the configured scope.
    pub scope: Option<Scope>,
    /// Caller metadata stored with the entry.
    pub metadata: Option<Map<String, Value>>,
    /// Time-to-live in seconds.
    pub ttl: Option<u64>,
}

/// Result of satisfying one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SatisfyOutcome {
    /// Requirement name.
    pub name: RequirementName,
    /// Scope the entry was written at.
    pub scope: Scope,
    /// True when the call was recorded as a session approval.
    pub approved: bool,
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Read-only snapshot of one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Requirement name.
    pub name: RequirementName,
    /// Requirement type.
    pub requirement_type: RequirementType,
    /// Configured scope.
    pub scope: Scope,
    /// Whether the requirement is enforced.
    pub enabled: bool,
    /// Recorded satisfaction (approval for dynamic and guard requirements).
    pub satisfied: bool,
    /// Whether the requirement was triggered.
    pub triggered: bool,
    /// When the effective entry was written.
    pub satisfied_at: Option<Timestamp>,
    /// How the effective entry was produced.
    pub method: Option<SatisfactionMethod>,
    /// When the effective entry expires.
    pub expires_at: Option<Timestamp>,
}

/// Read-only snapshot of every configured requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Branch the snapshot was taken on.
    pub branch: BranchName,
    /// Session the snapshot was taken for.
    pub session: SessionId,
    /// Per-requirement entries in configuration order.
    pub requirements: Vec<StatusEntry>,
}

impl StatusReport {
    /// Returns enabled blocking requirements that are triggered but not satisfied.
    ///
    /// Dynamic and guard requirements depend on live conditions, so missing
    /// approvals alone do not make them pending.
    #[must_use]
    pub fn unsatisfied(&self) -> Vec<&StatusEntry> {
        self.requirements
            .iter()
            .filter(|entry| {
                entry.enabled
                    && entry.requirement_type == RequirementType::Blocking
                    && entry.triggered
                    && !entry.satisfied
            })
            .collect()
    }
}

/// Result of a prune run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Branch documents removed because the branch no longer exists.
    pub removed_branches: Vec<BranchName>,
    /// Expired entries swept from remaining documents.
    pub swept_entries: usize,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Looks up a configured requirement by name.
///
/// # Errors
///
/// Returns [`OperationError::UnknownRequirement`] when `name` is not configured.
pub fn find_requirement<'a>(
    requirements: &'a [RequirementSpec],
    name: &RequirementName,
) -> Result<&'a RequirementSpec, OperationError> {
    requirements
        .iter()
        .find(|spec| &spec.name == name)
        .ok_or_else(|| OperationError::UnknownRequirement(name.to_string()))
}

/// Satisfies one or more requirements.
///
/// Dynamic and guard requirements are recorded as session approvals; all
/// names are validated before anything is written.
///
/// # Errors
///
/// Returns [`OperationError`] when no names are given or a name is unknown.
pub fn satisfy(
    services: &GateServices,
    requirements: &[RequirementSpec],
    target: &SessionContext,
    names: &[RequirementName],
    request: &SatisfyRequest,
) -> Result<Vec<SatisfyOutcome>, OperationError> {
    if names.is_empty() {
        return Err(OperationError::NoRequirements);
    }
    let specs = names.iter().map(|name| find_requirement(requirements, name)).collect::<Result<Vec<_>, _>>()?;
    let engine = services.engine(&target.branch, &target.session);
    let mut outcomes = Vec::with_capacity(specs.len());
    for spec in specs {
        if spec.is_approvable() {
            engine.approve(&spec.name, request.ttl.or_else(|| approval_ttl(spec)));
            outcomes.push(SatisfyOutcome {
                name: spec.name.clone(),
                scope: Scope::Session,
                approved: true,
            });
            continue;
        }
        let scope = request.scope.unwrap_or(spec.scope);
        engine.satisfy(&spec.name, scope, SatisfactionMethod::Cli, request.metadata.clone(), request.ttl);
        outcomes.push(SatisfyOutcome {
            name: spec.name.clone(),
            scope,
            approved: false,
        });
    }
    Ok(outcomes)
}

/// Clears a requirement at `scope` (default: its configured scope).
///
/// Dynamic and guard requirements only hold session approvals, so they are
/// always cleared at session scope. Clearing an unsatisfied requirement is a
/// no-op.
///
/// # Errors
///
/// Returns [`OperationError::UnknownRequirement`] when `name` is not configured.
pub fn clear(
    services: &GateServices,
    requirements: &[RequirementSpec],
    target: &SessionContext,
    name: &RequirementName,
    scope: Option<Scope>,
) -> Result<Scope, OperationError> {
    let spec = find_requirement(requirements, name)?;
    let scope = clear_scope(spec, scope);
    services.engine(&target.branch, &target.session).clear(&spec.name, scope);
    Ok(scope)
}

/// Clears every configured requirement at its configured scope in one write.
///
/// Returns the number of requirements cleared.
pub fn clear_all(services: &GateServices, requirements: &[RequirementSpec], target: &SessionContext) -> usize {
    let entries = requirements.iter().map(|spec| (spec.name.clone(), clear_scope(spec, None))).collect::<Vec<_>>();
    services.engine(&target.branch, &target.session).clear_many(&entries);
    entries.len()
}

/// Resolves the scope a clear applies to.
fn clear_scope(spec: &RequirementSpec, requested: Option<Scope>) -> Scope {
    if spec.is_approvable() { Scope::Session } else { requested.unwrap_or(spec.scope) }
}

/// Records a session-scoped approval for a dynamic or guard requirement.
///
/// # Errors
///
/// Returns [`OperationError`] when `name` is unknown or names a blocking requirement.
pub fn approve(
    services: &GateServices,
    requirements: &[RequirementSpec],
    target: &SessionContext,
    name: &RequirementName,
    ttl: Option<u64>,
) -> Result<(), OperationError> {
    let spec = find_requirement(requirements, name)?;
    if !spec.is_approvable() {
        return Err(OperationError::NotApprovable(name.to_string()));
    }
    services.engine(&target.branch, &target.session).approve(&spec.name, ttl.or_else(|| approval_ttl(spec)));
    Ok(())
}

/// Returns a read-only snapshot of every configured requirement.
#[must_use]
pub fn status(services: &GateServices, requirements: &[RequirementSpec], target: &SessionContext) -> StatusReport {
    let engine = services.engine(&target.branch, &target.session);
    let document = engine.document();
    let now = engine.now();
    let entries = requirements
        .iter()
        .map(|spec| {
            let state = document.requirement(&spec.name);
            let effective = state.and_then(|state| effective_entry(spec, state, &target.session, now));
            StatusEntry {
                name: spec.name.clone(),
                requirement_type: spec.requirement_type(),
                scope: spec.scope,
                enabled: spec.enabled,
                satisfied: effective.is_some(),
                triggered: state.is_some_and(|state| state.is_triggered(spec.scope, &target.session)),
                satisfied_at: effective.map(|entry| entry.satisfied_at),
                method: effective.map(|entry| entry.method),
                expires_at: effective.and_then(expiry_of),
            }
        })
        .collect();
    StatusReport {
        branch: target.branch.clone(),
        session: target.session.clone(),
        requirements: entries,
    }
}

/// Removes documents of deleted branches and sweeps expired entries.
///
/// # Errors
///
/// Returns [`OperationError::Store`] when the store cannot be enumerated or written.
pub fn prune(services: &GateServices, existing: &BTreeSet<BranchName>) -> Result<PruneReport, OperationError> {
    let store_err = |err: crate::interfaces::StoreError| OperationError::Store(err.to_string());
    let now = services.clock.now();
    let mut report = PruneReport::default();
    for branch in services.store.list_branches().map_err(store_err)? {
        if !existing.contains(&branch) {
            if services.store.remove(&branch).map_err(store_err)? {
                report.removed_branches.push(branch);
            }
            continue;
        }
        let mut swept = 0;
        services
            .store
            .update(&branch, &mut |document| {
                swept = document.sweep_expired(now);
            })
            .map_err(store_err)?;
        report.swept_entries += swept;
    }
    Ok(report)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the configured approval TTL for dynamic and guard requirements.
const fn approval_ttl(spec: &RequirementSpec) -> Option<u64> {
    match &spec.kind {
        RequirementKind::Blocking => None,
        RequirementKind::Dynamic(dynamic) => dynamic.approval_ttl,
        RequirementKind::Guard(guard) => guard.approval_ttl,
    }
}

/// Returns the entry currently satisfying `spec`, if any.
fn effective_entry<'a>(
    spec: &RequirementSpec,
    state: &'a RequirementState,
    session: &SessionId,
    now: Timestamp,
) -> Option<&'a SatisfactionEntry> {
    let session_entry = state.session_satisfaction(session).filter(|entry| entry.is_active(now));
    if spec.is_approvable() {
        return session_entry.filter(|entry| entry.method == SatisfactionMethod::Approval);
    }
    let branch_entry = state.branch.as_ref().filter(|entry| entry.is_active(now));
    if spec.scope.is_session_level() { branch_entry.or(session_entry) } else { branch_entry }
}

/// Returns the expiry time of an entry with a TTL.
fn expiry_of(entry: &SatisfactionEntry) -> Option<Timestamp> {
    entry.ttl.map(|ttl| {
        let millis = i64::try_from(ttl).unwrap_or(i64::MAX / 1_000).saturating_mul(1_000);
        Timestamp::from_unix_millis(entry.satisfied_at.as_unix_millis().saturating_add(millis))
    })
}
