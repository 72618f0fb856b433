// crates/requirement-gate-store-fs/src/branch_store.rs
// ============================================================================
// Module: File Branch State Store
// Description: One JSON document per branch under a project state directory.
// Purpose: Persist requirement state so it survives processes and sessions.
// Dependencies: requirement-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Documents live at `<dir>/<file-stem>.json`, where the stem is the
//! injective escaping from [`BranchName::file_stem`]. Loads hold a shared
//! lock; updates hold an exclusive lock across read, mutate, and atomic
//! write. Unknown format versions and unparsable files are reported by
//! [`BranchStateStore::load`] and replaced by an empty document on update.
//! Security posture: state files are untrusted input and reads are bounded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use requirement_gate_core::BranchDocument;
use requirement_gate_core::BranchName;
use requirement_gate_core::BranchStateStore;
use requirement_gate_core::STATE_FORMAT_VERSION;
use requirement_gate_core::StoreError;
use serde_json::Value;

use crate::file::LockGuard;
use crate::file::read_bounded;
use crate::file::write_atomic;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a branch document in bytes.
pub const MAX_STATE_BYTES: usize = 4 * 1024 * 1024;
/// Extension of branch documents.
const DOCUMENT_EXTENSION: &str = "json";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed [`BranchStateStore`] for one project.
///
/// # Invariants
/// - Every document path is derived from [`BranchName::file_stem`].
#[derive(Debug, Clone)]
pub struct FsBranchStateStore {
    /// Directory holding branch documents.
    dir: PathBuf,
}

impl FsBranchStateStore {
    /// Creates a store rooted at `dir`; the directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Returns the state directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the document path for a branch.
    #[must_use]
    pub fn document_path(&self, branch: &BranchName) -> PathBuf {
        self.dir.join(format!("{}.{DOCUMENT_EXTENSION}", branch.file_stem()))
    }

    /// Reads and validates the document at `path`, if present.
    fn read_document(path: &Path, branch: &BranchName) -> Result<Option<BranchDocument>, StoreError> {
        let Some(bytes) = read_bounded(path, MAX_STATE_BYTES).map_err(|err| StoreError::Io(err.to_string()))?
        else {
            return Ok(None);
        };
        if bytes.len() > MAX_STATE_BYTES {
            return Err(StoreError::Corrupt(format!("{} exceeds {MAX_STATE_BYTES} bytes", path.display())));
        }
        let value: Value = serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        match value.get("version").and_then(Value::as_str) {
            Some(STATE_FORMAT_VERSION) => {}
            Some(other) => return Err(StoreError::VersionMismatch(format!("unsupported version {other}"))),
            None => return Err(StoreError::VersionMismatch("missing version".to_string())),
        }
        let document: BranchDocument =
            serde_json::from_value(value).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        if document.branch != *branch {
            return Err(StoreError::Invalid(format!(
                "document for {} found at path of {}",
                document.branch, branch
            )));
        }
        Ok(Some(document))
    }
}

impl BranchStateStore for FsBranchStateStore {
    fn load(&self, branch: &BranchName) -> Result<Option<BranchDocument>, StoreError> {
        let path = self.document_path(branch);
        if !path.exists() {
            return Ok(None);
        }
        let _lock = LockGuard::shared(&path).map_err(|err| StoreError::Io(err.to_string()))?;
        Self::read_document(&path, branch)
    }

    fn update(
        &self,
        branch: &BranchName,
        mutate: &mut dyn FnMut(&mut BranchDocument),
    ) -> Result<BranchDocument, StoreError> {
        let path = self.document_path(branch);
        let _lock = LockGuard::exclusive(&path).map_err(|err| StoreError::Io(err.to_string()))?;
        let before = match Self::read_document(&path, branch) {
            Ok(Some(document)) => document,
            Ok(None) | Err(StoreError::Corrupt(_) | StoreError::VersionMismatch(_) | StoreError::Invalid(_)) => {
                BranchDocument::empty(branch.clone())
            }
            Err(err) => return Err(err),
        };
        let mut document = before.clone();
        mutate(&mut document);
        if document != before {
            let bytes = serde_json::to_vec_pretty(&document).map_err(|err| StoreError::Invalid(err.to_string()))?;
            write_atomic(&path, &bytes).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        Ok(document)
    }

    fn list_branches(&self) -> Result<Vec<BranchName>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };
        let mut branches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| StoreError::Io(err.to_string()))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(branch) = path.file_stem().and_then(|stem| stem.to_str()).and_then(BranchName::from_file_stem)
            {
                branches.push(branch);
            }
        }
        branches.sort();
        Ok(branches)
    }

    fn remove(&self, branch: &BranchName) -> Result<bool, StoreError> {
        let path = self.document_path(branch);
        if !path.exists() {
            return Ok(false);
        }
        let _lock = LockGuard::exclusive(&path).map_err(|err| StoreError::Io(err.to_string()))?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::Io(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
