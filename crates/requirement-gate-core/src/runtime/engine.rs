// crates/requirement-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Requirement State Engine
// Description: Scope-aware satisfaction, clearing, triggering, and approvals.
// Purpose: Be the only writer of branch documents, with fail-open persistence.
// Dependencies: crate::{core, interfaces, telemetry}, serde_json
// ============================================================================

//! ## Overview
//! A [`StateEngine`] is bound to one `(branch, session)` pair of a project
//! and exposes the four state operations the rest of the gate relies on:
//! `is_satisfied`, `satisfy`, `clear`, and `mark_triggered`.
//!
//! Reads that fail (missing, corrupt, or future-version documents) behave as
//! an empty document. Writes that fail are logged and applied to an in-memory
//! overlay so the current invocation observes its own mutation; nothing from
//! the overlay survives process exit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::BranchDocument;
use crate::core::BranchName;
use crate::core::Clock;
use crate::core::RequirementName;
use crate::core::SatisfactionEntry;
use crate::core::SatisfactionMethod;
use crate::core::Scope;
use crate::core::SessionEntry;
use crate::core::SessionId;
use crate::core::Timestamp;
use crate::interfaces::BranchStateStore;
use crate::interfaces::StoreError;
use crate::telemetry::EventLevel;
use crate::telemetry::EventSink;
use crate::telemetry::GateEvent;

// ============================================================================
// SECTION: State Engine
// ============================================================================

/// Requirement state manager for one branch and session.
pub struct StateEngine {
    /// Backing branch document store.
    store: Arc<dyn BranchStateStore>,
    /// Time source for timestamps and TTL checks.
    clock: Arc<dyn Clock>,
    /// Event sink for degraded paths.
    sink: Arc<dyn EventSink>,
    /// Branch the engine operates on.
    branch: BranchName,
    /// Session the engine operates on.
    session: SessionId,
    /// Document produced by a write that could not be persisted.
    overlay: Mutex<Option<BranchDocument>>,
}

impl StateEngine {
    /// Creates an engine bound to a branch and session.
    #[must_use]
    pub fn new(
        store: Arc<dyn BranchStateStore>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        branch: BranchName,
        session: SessionId,
    ) -> Self {
        Self {
            store,
            clock,
            sink,
            branch,
            session,
            overlay: Mutex::new(None),
        }
    }

    /// Returns the bound branch.
    #[must_use]
    pub const fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Returns the bound session.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// Returns the current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Returns the effective branch document, falling back to an empty one.
    #[must_use]
    pub fn document(&self) -> BranchDocument {
        if let Ok(overlay) = self.overlay.lock()
            && let Some(document) = overlay.as_ref()
        {
            return document.clone();
        }
        match self.store.load(&self.branch) {
            Ok(Some(document)) => document,
            Ok(None) => BranchDocument::empty(self.branch.clone()),
            Err(err) => {
                let event = match err {
                    StoreError::Corrupt(_) | StoreError::VersionMismatch(_) => "state_unreadable",
                    _ => "state_load_failed",
                };
                self.emit(GateEvent::new(event, EventLevel::Warn, self.now()).with_message(err.to_string()));
                BranchDocument::empty(self.branch.clone())
            }
        }
    }

    /// Returns true when `name` is satisfied for the bound session under `scope`.
    ///
    /// For session-level scopes an unexpired branch-level entry wins.
    #[must_use]
    pub fn is_satisfied(&self, name: &RequirementName, scope: Scope) -> bool {
        let now = self.now();
        self.document()
            .requirement(name)
            .is_some_and(|state| state.is_satisfied(scope, &self.session, now))
    }

    /// Returns true when `name` was triggered for the bound session under `scope`.
    #[must_use]
    pub fn is_triggered(&self, name: &RequirementName, scope: Scope) -> bool {
        self.document().requirement(name).is_some_and(|state| state.is_triggered(scope, &self.session))
    }

    /// Returns true when the bound session holds an unexpired approval for `name`.
    ///
    /// Branch-level entries are never treated as approvals.
    #[must_use]
    pub fn is_approved(&self, name: &RequirementName) -> bool {
        let now = self.now();
        self.document().requirement(name).and_then(|state| state.session_satisfaction(&self.session)).is_some_and(
            |entry| entry.method == SatisfactionMethod::Approval && entry.is_active(now),
        )
    }

    /// Records satisfaction of `name` at the granularity implied by `scope`.
    pub fn satisfy(
        &self,
        name: &RequirementName,
        scope: Scope,
        method: SatisfactionMethod,
        metadata: Option<Map<String, Value>>,
        ttl: Option<u64>,
    ) {
        let entry = SatisfactionEntry {
            satisfied: true,
            satisfied_at: self.now(),
            method,
            metadata,
            ttl,
        };
        let session = self.session.clone();
        self.mutate("satisfy", name, &mut |document| {
            let state = document.requirement_mut(name);
            if scope.is_session_level() {
                state.sessions.entry(session.clone()).or_default().satisfaction = Some(entry.clone());
            } else {
                state.branch = Some(entry.clone());
            }
        });
    }

    /// Records a session-scoped approval of `name`.
    pub fn approve(&self, name: &RequirementName, ttl: Option<u64>) {
        self.satisfy(name, Scope::Session, SatisfactionMethod::Approval, None, ttl);
    }

    /// Clears satisfaction of `name` under `scope`.
    ///
    /// Branch-level scopes drop the branch entry; session-level scopes drop the
    /// bound session's entry. Clearing absent state is a no-op.
    pub fn clear(&self, name: &RequirementName, scope: Scope) {
        let session = self.session.clone();
        self.mutate("clear", name, &mut |document| {
            if let Some(state) = document.requirements.get_mut(name) {
                if scope.is_session_level() {
                    state.sessions.remove(&session);
                } else {
                    state.branch = None;
                }
                if state.is_empty() {
                    document.requirements.remove(name);
                }
            }
        });
    }

    /// Clears several requirements in a single write.
    pub fn clear_many(&self, entries: &[(RequirementName, Scope)]) {
        let session = self.session.clone();
        self.mutate_document("clear_many", None, &mut |document| {
            for (name, scope) in entries {
                if let Some(state) = document.requirements.get_mut(name) {
                    if scope.is_session_level() {
                        state.sessions.remove(&session);
                    } else {
                        state.branch = None;
                    }
                }
            }
            document.requirements.retain(|_, state| !state.is_empty());
        });
    }

    /// Marks `name` as relevant for the bound session (or branch) under `scope`.
    pub fn mark_triggered(&self, name: &RequirementName, scope: Scope) {
        if self.is_triggered(name, scope) {
            return;
        }
        let session = self.session.clone();
        self.mutate("mark_triggered", name, &mut |document| {
            let state = document.requirement_mut(name);
            if scope.is_session_level() {
                state.sessions.entry(session.clone()).or_insert_with(SessionEntry::default).triggered = true;
            } else {
                state.triggered = true;
            }
        });
    }

    /// Removes every entry of the bound session in a single write.
    pub fn remove_session(&self) {
        let session = self.session.clone();
        self.mutate_document("remove_session", None, &mut |document| {
            document.remove_session(&session);
        });
    }

    /// Removes expired entries from the branch document.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.now();
        let mut removed = 0;
        self.mutate_document("sweep_expired", None, &mut |document| {
            removed = document.sweep_expired(now);
        });
        removed
    }

    /// Applies a mutation scoped to one requirement.
    fn mutate(&self, operation: &'static str, name: &RequirementName, apply: &mut dyn FnMut(&mut BranchDocument)) {
        self.mutate_document(operation, Some(name), apply);
    }

    /// Persists a mutation, falling back to the in-memory overlay on failure.
    fn mutate_document(
        &self,
        operation: &'static str,
        name: Option<&RequirementName>,
        apply: &mut dyn FnMut(&mut BranchDocument),
    ) {
        match self.store.update(&self.branch, apply) {
            Ok(_) => {
                if let Ok(mut overlay) = self.overlay.lock() {
                    overlay.take();
                }
            }
            Err(err) => {
                let mut document = self.document();
                apply(&mut document);
                if let Ok(mut overlay) = self.overlay.lock() {
                    *overlay = Some(document);
                }
                let mut event = GateEvent::new("state_write_dropped", EventLevel::Warn, self.now())
                    .with_message(err.to_string())
                    .with_detail(json!({ "operation": operation }));
                if let Some(name) = name {
                    event = event.with_requirement(name);
                }
                self.emit(event);
            }
        }
    }

    /// Records an event tagged with the bound branch and session.
    fn emit(&self, event: GateEvent) {
        self.sink.record(&event.with_branch(&self.branch).with_session(&self.session));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::StateEngine;
    use crate::core::BranchDocument;
    use crate::core::BranchName;
    use crate::core::ManualClock;
    use crate::core::RequirementName;
    use crate::core::SatisfactionMethod;
    use crate::core::Scope;
    use crate::core::Timestamp;
    use crate::interfaces::BranchStateStore;
    use crate::interfaces::StoreError;
    use crate::runtime::store::InMemoryBranchStateStore;
    use crate::telemetry::MemoryEventSink;

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl BranchStateStore for ReadOnlyStore {
        fn load(&self, _branch: &BranchName) -> Result<Option<BranchDocument>, StoreError> {
            Ok(None)
        }

        fn update(
            &self,
            _branch: &BranchName,
            _mutate: &mut dyn FnMut(&mut BranchDocument),
        ) -> Result<BranchDocument, StoreError> {
            Err(StoreError::Io("read-only filesystem".to_string()))
        }

        fn list_branches(&self) -> Result<Vec<BranchName>, StoreError> {
            Ok(Vec::new())
        }

        fn remove(&self, _branch: &BranchName) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    fn engine_with(store: Arc<dyn BranchStateStore>, sink: Arc<MemoryEventSink>) -> StateEngine {
        let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1_000)));
        StateEngine::new(store, clock, sink, "feature/x".into(), "s1".into())
    }

    #[test]
    fn failed_write_is_visible_to_the_same_engine_only() {
        let sink = Arc::new(MemoryEventSink::new());
        let engine = engine_with(Arc::new(ReadOnlyStore), Arc::clone(&sink));
        let name = RequirementName::new("commit_plan");
        engine.satisfy(&name, Scope::Session, SatisfactionMethod::Cli, None, None);
        assert!(engine.is_satisfied(&name, Scope::Session));
        assert!(sink.contains("state_write_dropped"));

        let fresh = engine_with(Arc::new(ReadOnlyStore), Arc::clone(&sink));
        assert!(!fresh.is_satisfied(&name, Scope::Session));
    }

    #[test]
    fn approval_ignores_branch_level_entries() {
        let store = Arc::new(InMemoryBranchStateStore::new());
        let engine = engine_with(store, Arc::new(MemoryEventSink::new()));
        let name = RequirementName::new("branch_size_limit");
        engine.satisfy(&name, Scope::Branch, SatisfactionMethod::Cli, None, None);
        assert!(!engine.is_approved(&name));
        engine.approve(&name, None);
        assert!(engine.is_approved(&name));
    }

    #[test]
    fn mark_triggered_is_idempotent() {
        let store = Arc::new(InMemoryBranchStateStore::new());
        let engine = engine_with(Arc::clone(&store) as Arc<dyn BranchStateStore>, Arc::new(MemoryEventSink::new()));
        let name = RequirementName::new("commit_plan");
        engine.mark_triggered(&name, Scope::Session);
        engine.mark_triggered(&name, Scope::Session);
        assert!(engine.is_triggered(&name, Scope::Session));
        assert_eq!(store.write_count(), 1);
    }
}
