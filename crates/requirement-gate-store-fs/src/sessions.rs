// crates/requirement-gate-store-fs/src/sessions.rs
// ============================================================================
// Module: File Session Registry
// Description: Shared JSON registry of recently active host sessions.
// Purpose: Let guards see other sessions working on the same branch.
// Dependencies: requirement-gate-core, serde, serde_json, dirs
// ============================================================================

//! ## Overview
//! The registry file maps session ids to their last known project, branch,
//! and activity time. Mutations run under an exclusive lock and skip the
//! write when nothing changed. A corrupt registry is rebuilt on the next
//! mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use requirement_gate_core::SessionId;
use requirement_gate_core::SessionRecord;
use requirement_gate_core::SessionRegistry;
use requirement_gate_core::StoreError;
use serde::Deserialize;
use serde::Serialize;

use crate::file::LockGuard;
use crate::file::read_bounded;
use crate::file::write_atomic;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of the registry file in bytes.
pub const MAX_REGISTRY_BYTES: usize = 1024 * 1024;
/// Registry location relative to the home directory.
const REGISTRY_RELATIVE_PATH: &str = ".claude/requirement-gate/sessions.json";

/// Returns the default registry path, when a home directory is known.
#[must_use]
pub fn default_registry_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(REGISTRY_RELATIVE_PATH))
}

// ============================================================================
// SECTION: Registry File
// ============================================================================

/// On-disk registry layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RegistryFile {
    /// Records keyed by session id.
    #[serde(default)]
    sessions: BTreeMap<SessionId, SessionRecord>,
}

/// File-backed [`SessionRegistry`].
#[derive(Debug, Clone)]
pub struct FileSessionRegistry {
    /// Registry file path.
    path: PathBuf,
}

impl FileSessionRegistry {
    /// Creates a registry backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the registry file.
    fn read(&self) -> Result<RegistryFile, StoreError> {
        let Some(bytes) =
            read_bounded(&self.path, MAX_REGISTRY_BYTES).map_err(|err| StoreError::Io(err.to_string()))?
        else {
            return Ok(RegistryFile::default());
        };
        if bytes.len() > MAX_REGISTRY_BYTES {
            return Err(StoreError::Corrupt("session registry exceeds size limit".to_string()));
        }
        serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    /// Runs `mutate` under the exclusive lock and writes when it changed anything.
    fn mutate<T>(&self, mutate: impl FnOnce(&mut RegistryFile) -> T) -> Result<T, StoreError> {
        let _lock = LockGuard::exclusive(&self.path).map_err(|err| StoreError::Io(err.to_string()))?;
        let before = match self.read() {
            Ok(registry) => registry,
            Err(StoreError::Corrupt(_)) => RegistryFile::default(),
            Err(err) => return Err(err),
        };
        let mut registry = before.clone();
        let result = mutate(&mut registry);
        if registry != before {
            let bytes = serde_json::to_vec_pretty(&registry).map_err(|err| StoreError::Invalid(err.to_string()))?;
            write_atomic(&self.path, &bytes).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        Ok(result)
    }
}

impl SessionRegistry for FileSessionRegistry {
    fn touch(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.mutate(|registry| {
            registry.sessions.insert(record.session.clone(), record);
        })
    }

    fn remove(&self, session: &SessionId) -> Result<bool, StoreError> {
        self.mutate(|registry| registry.sessions.remove(session).is_some())
    }

    fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let _lock = LockGuard::shared(&self.path).map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(self.read()?.sessions.into_values().collect())
    }
}
