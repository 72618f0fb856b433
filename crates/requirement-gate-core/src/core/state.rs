// crates/requirement-gate-core/src/core/state.rs
// ============================================================================
// Module: Requirement State Records
// Description: Persisted satisfaction and trigger state per branch document.
// Purpose: Define the unit of persistence and its read-time semantics.
// Dependencies: crate::core::{identifiers, spec, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`BranchDocument`] holds one [`RequirementState`] per requirement name.
//! Each state carries an optional branch-level entry (branch/permanent scope,
//! or an override for session-level scopes), per-session entries, and a
//! branch-level `triggered` flag. TTL expiry is evaluated lazily on read and
//! never swept implicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::BranchName;
use crate::core::identifiers::RequirementName;
use crate::core::identifiers::SessionId;
use crate::core::spec::Scope;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current branch document format version.
pub const STATE_FORMAT_VERSION: &str = "1";

// ============================================================================
// SECTION: Satisfaction Entries
// ============================================================================

/// How a satisfaction entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatisfactionMethod {
    /// Explicit command-line satisfaction.
    Cli,
    /// Session-scoped approval of a dynamic or guard requirement.
    Approval,
    /// Automatic satisfaction after a mapped skill completed.
    Skill,
    /// Satisfaction recorded by a host integration.
    Hook,
}

impl SatisfactionMethod {
    /// Returns the stable label for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Approval => "approval",
            Self::Skill => "skill",
            Self::Hook => "hook",
        }
    }
}

/// One satisfaction record.
///
/// # Invariants
/// - `ttl` is in seconds relative to `satisfied_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionEntry {
    /// Satisfaction flag.
    pub satisfied: bool,
    /// When the entry was written.
    pub satisfied_at: Timestamp,
    /// How the entry was produced.
    pub method: SatisfactionMethod,
    /// Optional caller metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Optional time-to-live in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl SatisfactionEntry {
    /// Returns true when the entry is satisfied and unexpired at `now`.
    #[must_use]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.satisfied && !self.is_expired(now)
    }

    /// Returns true when the entry's TTL has elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.satisfied_at.is_expired(self.ttl, now)
    }
}

/// Per-session state for a requirement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Session-level satisfaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<SatisfactionEntry>,
    /// Whether the requirement was relevant to this session.
    #[serde(default)]
    pub triggered: bool,
}

impl SessionEntry {
    /// Returns true when the entry carries no information.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.satisfaction.is_none() && !self.triggered
    }
}

// ============================================================================
// SECTION: Requirement State
// ============================================================================

/// Persisted state for a single requirement on a branch.
///
/// # Invariants
/// - An active `branch` entry takes precedence over session entries for
///   session-level scopes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementState {
    /// Branch-level satisfaction (or override).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<SatisfactionEntry>,
    /// Session-level entries keyed by session id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sessions: BTreeMap<SessionId, SessionEntry>,
    /// Branch-level triggered flag.
    #[serde(default)]
    pub triggered: bool,
}

impl RequirementState {
    /// Returns true when the requirement is satisfied for `session` under `scope`.
    #[must_use]
    pub fn is_satisfied(&self, scope: Scope, session: &SessionId, now: Timestamp) -> bool {
        let branch_active = self.branch.as_ref().is_some_and(|entry| entry.is_active(now));
        if !scope.is_session_level() {
            return branch_active;
        }
        if branch_active {
            return true;
        }
        self.session_satisfaction(session).is_some_and(|entry| entry.is_active(now))
    }

    /// Returns the session-level satisfaction entry, if any.
    #[must_use]
    pub fn session_satisfaction(&self, session: &SessionId) -> Option<&SatisfactionEntry> {
        self.sessions.get(session).and_then(|entry| entry.satisfaction.as_ref())
    }

    /// Returns true when the requirement was triggered for `session` under `scope`.
    #[must_use]
    pub fn is_triggered(&self, scope: Scope, session: &SessionId) -> bool {
        if scope.is_session_level() {
            self.sessions.get(session).is_some_and(|entry| entry.triggered)
        } else {
            self.triggered
        }
    }

    /// Returns true when the state carries no information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.sessions.is_empty() && !self.triggered
    }

    /// Removes expired satisfaction entries and empty session entries.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        if self.branch.as_ref().is_some_and(|entry| entry.is_expired(now)) {
            self.branch = None;
            removed += 1;
        }
        for entry in self.sessions.values_mut() {
            if entry.satisfaction.as_ref().is_some_and(|satisfaction| satisfaction.is_expired(now)) {
                entry.satisfaction = None;
                removed += 1;
            }
        }
        self.sessions.retain(|_, entry| !entry.is_empty());
        removed
    }
}

// ============================================================================
// SECTION: Branch Document
// ============================================================================

/// Unit of persistence: all requirement state for one project branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDocument {
    /// Format version tag.
    pub version: String,
    /// Branch the document belongs to.
    pub branch: BranchName,
    /// Requirement states keyed by name.
    #[serde(default)]
    pub requirements: BTreeMap<RequirementName, RequirementState>,
}

impl BranchDocument {
    /// Creates an empty document for a branch.
    #[must_use]
    pub fn empty(branch: BranchName) -> Self {
        Self {
            version: STATE_FORMAT_VERSION.to_string(),
            branch,
            requirements: BTreeMap::new(),
        }
    }

    /// Returns true when the document uses the current format version.
    #[must_use]
    pub fn is_current_version(&self) -> bool {
        self.version == STATE_FORMAT_VERSION
    }

    /// Returns the state for a requirement, if present.
    #[must_use]
    pub fn requirement(&self, name: &RequirementName) -> Option<&RequirementState> {
        self.requirements.get(name)
    }

    /// Returns a mutable state for a requirement, inserting an empty one.
    pub fn requirement_mut(&mut self, name: &RequirementName) -> &mut RequirementState {
        self.requirements.entry(name.clone()).or_default()
    }

    /// Removes every entry belonging to `session`.
    ///
    /// Returns true when anything was removed.
    pub fn remove_session(&mut self, session: &SessionId) -> bool {
        let mut removed = false;
        for state in self.requirements.values_mut() {
            removed |= state.sessions.remove(session).is_some();
        }
        self.requirements.retain(|_, state| !state.is_empty());
        removed
    }

    /// Sweeps expired entries from every requirement.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self, now: Timestamp) -> usize {
        let removed = self.requirements.values_mut().map(|state| state.sweep_expired(now)).sum();
        self.requirements.retain(|_, state| !state.is_empty());
        removed
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
