// crates/requirement-gate-store-fs/src/ttl_store.rs
// ============================================================================
// Module: File TTL Store
// Description: Small JSON key-value file with per-record lifetimes.
// Purpose: Back the dedup and calculation caches across short-lived processes.
// Dependencies: requirement-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The whole cache is a single JSON object of [`CacheRecord`]s. Writes purge
//! expired records. An unparsable cache file is reported by `get` and starts
//! over empty on the next write, since cache contents are disposable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::path::PathBuf;

use requirement_gate_core::CacheError;
use requirement_gate_core::CacheRecord;
use requirement_gate_core::Timestamp;
use requirement_gate_core::TtlStore;

use crate::file::LockGuard;
use crate::file::read_bounded;
use crate::file::write_atomic;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a cache file in bytes.
pub const MAX_CACHE_BYTES: usize = 1024 * 1024;
/// Cache directory name under the system temporary directory.
pub const CACHE_DIR_NAME: &str = "requirement-gate";
/// Dedup cache file name.
pub const DEDUP_CACHE_FILE: &str = "dedup.json";
/// Calculation cache file name.
pub const CALCULATION_CACHE_FILE: &str = "calculations.json";

/// Returns the default cache directory (`$TMPDIR/requirement-gate`).
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    env::temp_dir().join(CACHE_DIR_NAME)
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Records keyed by cache key.
type Records = BTreeMap<String, CacheRecord>;

/// File-backed [`TtlStore`].
#[derive(Debug, Clone)]
pub struct FileTtlStore {
    /// Cache file path.
    path: PathBuf,
}

impl FileTtlStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record.
    fn read_records(&self) -> Result<Records, CacheError> {
        let Some(bytes) = read_bounded(&self.path, MAX_CACHE_BYTES).map_err(|err| CacheError::Io(err.to_string()))?
        else {
            return Ok(Records::new());
        };
        if bytes.len() > MAX_CACHE_BYTES {
            return Err(CacheError::Corrupt("cache file exceeds size limit".to_string()));
        }
        serde_json::from_slice(&bytes).map_err(|err| CacheError::Corrupt(err.to_string()))
    }
}

impl TtlStore for FileTtlStore {
    fn get(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let _lock = LockGuard::shared(&self.path).map_err(|err| CacheError::Io(err.to_string()))?;
        Ok(self.read_records()?.remove(key))
    }

    fn update(
        &self,
        key: &str,
        now: Timestamp,
        decide: &mut dyn FnMut(Option<&CacheRecord>) -> Option<CacheRecord>,
    ) -> Result<(), CacheError> {
        let _lock = LockGuard::exclusive(&self.path).map_err(|err| CacheError::Io(err.to_string()))?;
        let mut records = match self.read_records() {
            Ok(records) => records,
            Err(CacheError::Corrupt(_)) => Records::new(),
            Err(err) => return Err(err),
        };
        let Some(record) = decide(records.get(key)) else {
            return Ok(());
        };
        records.retain(|_, existing| existing.is_fresh(now));
        records.insert(key.to_string(), record);
        let bytes = serde_json::to_vec(&records).map_err(|err| CacheError::Store(err.to_string()))?;
        write_atomic(&self.path, &bytes).map_err(|err| CacheError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test fixtures use explicit expects for clarity.")]

    use std::fs;

    use requirement_gate_core::CacheError;
    use requirement_gate_core::CacheRecord;
    use requirement_gate_core::Timestamp;
    use requirement_gate_core::TtlStore;
    use serde_json::json;

    use super::FileTtlStore;

    fn record(at: i64, ttl_secs: u64) -> CacheRecord {
        CacheRecord {
            value: json!("fingerprint"),
            stored_at: Timestamp::from_unix_millis(at),
            ttl_secs,
        }
    }

    #[test]
    fn writes_purge_expired_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTtlStore::new(dir.path().join("dedup.json"));
        store.update("old", Timestamp::from_unix_millis(0), &mut |_| Some(record(0, 1))).expect("first");
        store
            .update("new", Timestamp::from_unix_millis(10_000), &mut |_| Some(record(10_000, 5)))
            .expect("second");
        assert!(store.get("old").expect("get").is_none());
        assert_eq!(store.get("new").expect("get"), Some(record(10_000, 5)));
    }

    #[test]
    fn declined_update_leaves_file_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTtlStore::new(dir.path().join("dedup.json"));
        store.update("key", Timestamp::from_unix_millis(0), &mut |_| None).expect("update");
        assert!(!store.path().exists());
    }

    #[test]
    fn corrupt_cache_is_reported_then_rebuilt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTtlStore::new(dir.path().join("calculations.json"));
        fs::write(store.path(), "{not json").expect("seed");
        assert!(matches!(store.get("key"), Err(CacheError::Corrupt(_))));
        store.update("key", Timestamp::from_unix_millis(0), &mut |current| {
            assert!(current.is_none());
            Some(record(0, 30))
        })
        .expect("update");
        assert!(store.get("key").expect("get").is_some());
    }
}
