//! Git-backed provider tests for requirement-gate-providers.
// crates/requirement-gate-providers/tests/git_repository.rs
// =============================================================================
// Module: Git Repository Tests
// Description: Exercise git facts and branch size against a scratch repository.
// Purpose: Ensure queries resolve branches, state dirs, and diff sizes.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::process::Command;

use requirement_gate_core::BranchName;
use requirement_gate_core::CalculationContext;
use requirement_gate_core::Calculator;
use requirement_gate_providers::BranchSizeCalculator;
use requirement_gate_providers::GitFacts;
use requirement_gate_providers::VcsError;
use tempfile::TempDir;

/// Runs git in `dir`, panicking on failure.
fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=Gate Test", "-c", "user.email=gate@test.invalid", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("spawn git");
    assert!(status.success(), "git {args:?} failed");
}

/// Creates a repository on `main` with one commit; `None` when git is unavailable.
fn scratch_repo() -> Option<TempDir> {
    if Command::new("git").arg("--version").output().is_err() {
        return None;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    git(dir.path(), &["init", "--quiet"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    fs::write(dir.path().join("README.md"), "one\ntwo\n").expect("seed");
    git(dir.path(), &["add", "README.md"]);
    git(dir.path(), &["commit", "--quiet", "-m", "init"]);
    Some(dir)
}

#[test]
fn discovers_root_branch_and_state_dir() {
    let Some(repo) = scratch_repo() else {
        return;
    };
    let nested = repo.path().join("src/deep");
    fs::create_dir_all(&nested).unwrap();
    let facts = GitFacts::discover(&nested).unwrap();
    assert_eq!(facts.root().canonicalize().unwrap(), repo.path().canonicalize().unwrap());
    assert_eq!(facts.current_branch().unwrap(), BranchName::new("main"));
    assert!(facts.state_dir().unwrap().ends_with(".git/requirements"));

    git(repo.path(), &["checkout", "--quiet", "-b", "feature/x"]);
    let branches = facts.branches().unwrap();
    assert!(branches.contains(&BranchName::new("main")));
    assert!(branches.contains(&BranchName::new("feature/x")));
}

#[test]
fn branch_size_counts_committed_and_uncommitted_lines() {
    let Some(repo) = scratch_repo() else {
        return;
    };
    git(repo.path(), &["checkout", "--quiet", "-b", "feature/x"]);
    fs::write(repo.path().join("a.txt"), "1\n2\n3\n").unwrap();
    git(repo.path(), &["add", "a.txt"]);
    git(repo.path(), &["commit", "--quiet", "-m", "add a"]);
    fs::write(repo.path().join("README.md"), "one\n").unwrap();

    let branch = BranchName::new("feature/x");
    let value = BranchSizeCalculator
        .compute(&CalculationContext {
            project: repo.path(),
            branch: &branch,
            base_branch: "main",
        })
        .unwrap();
    assert!((value.value - 4.0).abs() < f64::EPSILON, "unexpected size {}", value.value);
    assert!(value.detail.unwrap().contains("vs main"));
}

#[test]
fn unknown_base_branch_is_an_error() {
    let Some(repo) = scratch_repo() else {
        return;
    };
    let result = GitFacts::at(repo.path()).diff_against("develop");
    assert!(matches!(result, Err(VcsError::Failed { .. })));
}

#[test]
fn outside_a_repository_is_reported() {
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let result = GitFacts::discover(dir.path());
    assert!(matches!(result, Err(VcsError::NotARepository(_))));
}
