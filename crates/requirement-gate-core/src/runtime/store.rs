// crates/requirement-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Requirement Gate In-Memory Stores
// Description: In-memory branch store, TTL store, and session registry.
// Purpose: Provide deterministic backends for tests without touching disk.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! These implementations mirror the locking contracts of the file-backed
//! stores with a mutex. They are intended for tests and embedding, not for
//! sharing state across processes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::core::BranchDocument;
use crate::core::BranchName;
use crate::core::SessionId;
use crate::core::Timestamp;
use crate::interfaces::BranchStateStore;
use crate::interfaces::CacheError;
use crate::interfaces::CacheRecord;
use crate::interfaces::SessionRecord;
use crate::interfaces::SessionRegistry;
use crate::interfaces::StoreError;
use crate::interfaces::TtlStore;

// ============================================================================
// SECTION: Branch State Store
// ============================================================================

/// In-memory branch state store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBranchStateStore {
    /// Documents keyed by branch.
    documents: Arc<Mutex<BTreeMap<BranchName, BranchDocument>>>,
    /// Number of persisted writes.
    writes: Arc<AtomicUsize>,
}

impl InMemoryBranchStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of writes performed so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Replaces a document directly, bypassing the write counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the mutex is poisoned.
    pub fn insert(&self, document: BranchDocument) -> Result<(), StoreError> {
        self.lock()?.insert(document.branch.clone(), document);
        Ok(())
    }

    /// Locks the document map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<BranchName, BranchDocument>>, StoreError> {
        self.documents.lock().map_err(|_| StoreError::Store("branch state store mutex poisoned".to_string()))
    }
}

impl BranchStateStore for InMemoryBranchStateStore {
    fn load(&self, branch: &BranchName) -> Result<Option<BranchDocument>, StoreError> {
        Ok(self.lock()?.get(branch).filter(|document| document.is_current_version()).cloned())
    }

    fn update(
        &self,
        branch: &BranchName,
        mutate: &mut dyn FnMut(&mut BranchDocument),
    ) -> Result<BranchDocument, StoreError> {
        let mut guard = self.lock()?;
        let before = guard
            .get(branch)
            .filter(|document| document.is_current_version())
            .cloned()
            .unwrap_or_else(|| BranchDocument::empty(branch.clone()));
        let mut document = before.clone();
        mutate(&mut document);
        if document != before {
            guard.insert(branch.clone(), document.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(document)
    }

    fn list_branches(&self) -> Result<Vec<BranchName>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn remove(&self, branch: &BranchName) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(branch).is_some())
    }
}

// ============================================================================
// SECTION: TTL Store
// ============================================================================

/// In-memory TTL store backing dedup and calculation caches in tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTtlStore {
    /// Records keyed by cache key.
    records: Arc<Mutex<BTreeMap<String, CacheRecord>>>,
}

impl InMemoryTtlStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or_default()
    }

    /// Returns true when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TtlStore for InMemoryTtlStore {
    fn get(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let guard = self.records.lock().map_err(|_| CacheError::Store("cache mutex poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn update(
        &self,
        key: &str,
        now: Timestamp,
        decide: &mut dyn FnMut(Option<&CacheRecord>) -> Option<CacheRecord>,
    ) -> Result<(), CacheError> {
        let mut guard = self.records.lock().map_err(|_| CacheError::Store("cache mutex poisoned".to_string()))?;
        if let Some(record) = decide(guard.get(key)) {
            guard.retain(|_, existing| existing.is_fresh(now));
            guard.insert(key.to_string(), record);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Session Registry
// ============================================================================

/// In-memory session registry for tests.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionRegistry {
    /// Records keyed by session.
    records: Arc<Mutex<BTreeMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<SessionId, SessionRecord>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Store("session registry mutex poisoned".to_string()))
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn touch(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.lock()?.insert(record.session.clone(), record);
        Ok(())
    }

    fn remove(&self, session: &SessionId) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(session).is_some())
    }

    fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }
}
