// crates/requirement-gate-providers/src/git.rs
// ============================================================================
// Module: Git Facts
// Description: Read-only queries against the local git repository.
// Purpose: Supply project root, branch, state location, and diff sizes.
// Dependencies: requirement-gate-core, thiserror
// ============================================================================

//! ## Overview
//! All queries shell out to the `git` binary with the project root as the
//! working directory. Nothing here writes to the repository. Failures are
//! reported as [`VcsError`]; callers decide whether to fail open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use requirement_gate_core::BranchName;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory under the git common dir holding branch state documents.
pub const STATE_DIR_NAME: &str = "requirements";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Version control query errors.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The git binary could not be started.
    #[error("failed to run git: {0}")]
    Spawn(String),
    /// The directory is not inside a git work tree.
    #[error("not a git repository: {0}")]
    NotARepository(String),
    /// HEAD does not point at a branch.
    #[error("HEAD is detached")]
    DetachedHead,
    /// A git command exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    Failed {
        /// Arguments that were run.
        command: String,
        /// Trimmed standard error.
        stderr: String,
    },
    /// Git output could not be interpreted.
    #[error("unexpected git output: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Diff Summary
// ============================================================================

/// Line counts from `git diff --numstat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    /// Lines added.
    pub added: u64,
    /// Lines deleted.
    pub deleted: u64,
    /// Text files changed.
    pub files: u64,
}

impl DiffStat {
    /// Returns added plus deleted lines.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.added.saturating_add(self.deleted)
    }

    /// Parses `--numstat` output; binary entries (`-`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Parse`] when a line has unexpected fields.
    pub fn parse_numstat(output: &str) -> Result<Self, VcsError> {
        let mut stat = Self::default();
        for line in output.lines().filter(|line| !line.trim().is_empty()) {
            let mut fields = line.split('\t');
            let (Some(added), Some(deleted)) = (fields.next(), fields.next()) else {
                return Err(VcsError::Parse(line.to_string()));
            };
            if added == "-" || deleted == "-" {
                continue;
            }
            let added: u64 = added.parse().map_err(|_| VcsError::Parse(line.to_string()))?;
            let deleted: u64 = deleted.parse().map_err(|_| VcsError::Parse(line.to_string()))?;
            stat.added = stat.added.saturating_add(added);
            stat.deleted = stat.deleted.saturating_add(deleted);
            stat.files += 1;
        }
        Ok(stat)
    }
}

// ============================================================================
// SECTION: Repository Handle
// ============================================================================

/// Handle on a git work tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFacts {
    /// Work tree root.
    root: PathBuf,
}

impl GitFacts {
    /// Wraps a known work tree root without probing it.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Finds the work tree containing `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NotARepository`] when `dir` is outside a work tree.
    pub fn discover(dir: &Path) -> Result<Self, VcsError> {
        let root = run_git(dir, &["rev-parse", "--show-toplevel"]).map_err(|err| match err {
            VcsError::Failed {
                stderr,
                ..
            } => VcsError::NotARepository(stderr),
            other => other,
        })?;
        Ok(Self::at(root))
    }

    /// Returns the work tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::DetachedHead`] when HEAD is not on a branch.
    pub fn current_branch(&self) -> Result<BranchName, VcsError> {
        let name = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if name == "HEAD" {
            return Err(VcsError::DetachedHead);
        }
        Ok(BranchName::new(name))
    }

    /// Returns the git common directory shared by all work trees.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError`] when the query fails.
    pub fn common_dir(&self) -> Result<PathBuf, VcsError> {
        let dir = PathBuf::from(self.git(&["rev-parse", "--git-common-dir"])?);
        Ok(if dir.is_absolute() { dir } else { self.root.join(dir) })
    }

    /// Returns the directory holding branch state documents.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError`] when the common directory cannot be resolved.
    pub fn state_dir(&self) -> Result<PathBuf, VcsError> {
        Ok(self.common_dir()?.join(STATE_DIR_NAME))
    }

    /// Lists local branch names.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError`] when the query fails.
    pub fn branches(&self) -> Result<BTreeSet<BranchName>, VcsError> {
        let output = self.git(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])?;
        Ok(output.lines().filter(|line| !line.is_empty()).map(BranchName::from).collect())
    }

    /// Returns true when `reference` resolves to a commit.
    #[must_use]
    pub fn has_ref(&self, reference: &str) -> bool {
        self.git(&["rev-parse", "--verify", "--quiet", &format!("{reference}^{{commit}}")]).is_ok()
    }

    /// Summarizes changes between the merge base with `base` and the work tree.
    ///
    /// Falls back to `origin/<base>` when `base` is not a local branch.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError`] when no merge base exists or the diff fails.
    pub fn diff_against(&self, base: &str) -> Result<DiffStat, VcsError> {
        let remote = format!("origin/{base}");
        let base_ref = if self.has_ref(base) {
            base
        } else if self.has_ref(&remote) {
            remote.as_str()
        } else {
            return Err(VcsError::Failed {
                command: format!("rev-parse {base}"),
                stderr: format!("unknown base branch {base}"),
            });
        };
        let merge_base = self.git(&["merge-base", base_ref, "HEAD"])?;
        let output = self.git(&["diff", "--numstat", &merge_base])?;
        DiffStat::parse_numstat(&output)
    }

    /// Runs git in the work tree root.
    fn git(&self, args: &[&str]) -> Result<String, VcsError> {
        run_git(&self.root, args)
    }
}

/// Runs git with `args` in `dir` and returns trimmed stdout.
fn run_git(dir: &Path, args: &[&str]) -> Result<String, VcsError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|err| VcsError::Spawn(err.to_string()))?;
    if !output.status.success() {
        return Err(VcsError::Failed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    String::from_utf8(output.stdout)
        .map(|stdout| stdout.trim().to_string())
        .map_err(|err| VcsError::Parse(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test fixtures use explicit expects for clarity.")]

    use super::DiffStat;

    #[test]
    fn numstat_skips_binary_entries() {
        let stat = DiffStat::parse_numstat("10\t2\tsrc/lib.rs\n-\t-\tlogo.png\n3\t0\tREADME.md\n")
            .expect("parse");
        assert_eq!(
            stat,
            DiffStat {
                added: 13,
                deleted: 2,
                files: 2,
            }
        );
        assert_eq!(stat.total(), 15);
    }

    #[test]
    fn numstat_rejects_garbage() {
        assert!(DiffStat::parse_numstat("ten\ttwo\tfile\n").is_err());
        assert_eq!(DiffStat::parse_numstat("").expect("empty"), DiffStat::default());
    }
}
