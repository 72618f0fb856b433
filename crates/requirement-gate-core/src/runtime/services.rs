// crates/requirement-gate-core/src/runtime/services.rs
// ============================================================================
// Module: Requirement Gate Services
// Description: Explicit bundle of store, cache, catalog, clock, and sink handles.
// Purpose: Pass every shared resource by handle instead of through globals.
// Dependencies: crate::{core, interfaces, runtime, telemetry}
// ============================================================================

//! ## Overview
//! [`GateServices`] is assembled once per invocation by the host adapter and
//! borrowed by the checker, lifecycle hooks, and direct operations. The
//! branch store is bound to one project; caches and the session registry may
//! be shared between projects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use crate::core::BranchName;
use crate::core::Clock;
use crate::core::SessionId;
use crate::interfaces::BranchStateStore;
use crate::interfaces::CalculatorCatalog;
use crate::interfaces::GuardCatalog;
use crate::interfaces::SessionRecord;
use crate::interfaces::SessionRegistry;
use crate::runtime::cache::CalculationCache;
use crate::runtime::cache::DedupCache;
use crate::runtime::engine::StateEngine;
use crate::telemetry::EventLevel;
use crate::telemetry::EventSink;
use crate::telemetry::GateEvent;

// ============================================================================
// SECTION: Services
// ============================================================================

/// Shared handles used by every gate operation.
#[derive(Clone)]
pub struct GateServices {
    /// Branch state store for the current project.
    pub store: Arc<dyn BranchStateStore>,
    /// Denial dedup cache.
    pub dedup: DedupCache,
    /// Calculator result cache.
    pub calculations: CalculationCache,
    /// Calculator table.
    pub calculators: Arc<dyn CalculatorCatalog>,
    /// Guard condition table.
    pub guards: Arc<dyn GuardCatalog>,
    /// Active session registry.
    pub sessions: Arc<dyn SessionRegistry>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Event sink.
    pub sink: Arc<dyn EventSink>,
}

impl GateServices {
    /// Builds a state engine bound to `branch` and `session`.
    #[must_use]
    pub fn engine(&self, branch: &BranchName, session: &SessionId) -> StateEngine {
        StateEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            Arc::clone(&self.sink),
            branch.clone(),
            session.clone(),
        )
    }

    /// Records an event.
    pub fn emit(&self, event: &GateEvent) {
        self.sink.record(event);
    }

    /// Refreshes the session registry entry, logging failures.
    pub fn touch_session(&self, project: &Path, branch: &BranchName, session: &SessionId) {
        let record = SessionRecord {
            session: session.clone(),
            project: project.to_path_buf(),
            branch: branch.clone(),
            last_seen: self.clock.now(),
        };
        if let Err(err) = self.sessions.touch(record) {
            self.emit(
                &GateEvent::new("session_registry_unavailable", EventLevel::Warn, self.clock.now())
                    .with_session(session)
                    .with_message(err.to_string()),
            );
        }
    }

    /// Drops the session registry entry, logging failures.
    pub fn forget_session(&self, session: &SessionId) {
        if let Err(err) = self.sessions.remove(session) {
            self.emit(
                &GateEvent::new("session_registry_unavailable", EventLevel::Warn, self.clock.now())
                    .with_session(session)
                    .with_message(err.to_string()),
            );
        }
    }
}
