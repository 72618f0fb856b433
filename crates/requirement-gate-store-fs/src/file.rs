// crates/requirement-gate-store-fs/src/file.rs
// ============================================================================
// Module: File Primitives
// Description: Advisory lock sidecars, bounded reads, and atomic replacement.
// Purpose: Give every file-backed store the same read/write discipline.
// Dependencies: fs2, tempfile
// ============================================================================

//! ## Overview
//! Each data file `<name>` is guarded by a sidecar `<name>.lock`. Readers hold
//! a shared lock, read-modify-write cycles hold an exclusive lock, and writes
//! land through a temporary file in the same directory that is synced and
//! renamed over the target. Readers therefore never observe a partial write
//! and writers serialize across processes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use fs2::FileExt;
use tempfile::NamedTempFile;

// ============================================================================
// SECTION: Locks
// ============================================================================

/// Held advisory lock on a sidecar file; released when dropped.
#[derive(Debug)]
pub(crate) struct LockGuard {
    /// Open sidecar handle carrying the lock.
    file: File,
}

impl LockGuard {
    /// Acquires a shared lock for `data_path`, blocking until available.
    pub(crate) fn shared(data_path: &Path) -> io::Result<Self> {
        let file = open_sidecar(data_path)?;
        FileExt::lock_shared(&file)?;
        Ok(Self {
            file,
        })
    }

    /// Acquires an exclusive lock for `data_path`, blocking until available.
    pub(crate) fn exclusive(data_path: &Path) -> io::Result<Self> {
        let file = open_sidecar(data_path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(Self {
            file,
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Returns the lock sidecar path for a data file.
#[must_use]
pub(crate) fn lock_path(data_path: &Path) -> PathBuf {
    let mut name = data_path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    data_path.with_file_name(name)
}

/// Opens (creating) the sidecar lock file.
fn open_sidecar(data_path: &Path) -> io::Result<File> {
    if let Some(parent) = data_path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().read(true).write(true).create(true).truncate(false).open(lock_path(data_path))
}

// ============================================================================
// SECTION: Reads and Writes
// ============================================================================

/// Reads at most `max_bytes + 1` bytes; `None` when the file is absent.
///
/// Callers treat a result longer than `max_bytes` as oversized.
pub(crate) fn read_bounded(path: &Path, max_bytes: usize) -> io::Result<Option<Vec<u8>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Replaces `path` with `bytes` via a synced temporary file and rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
