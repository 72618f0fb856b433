// crates/requirement-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Fixtures
// Description: Temporary project layouts with configuration documents.
// Purpose: Share document-writing helpers across config integration tests.
// =============================================================================

#![allow(dead_code, reason = "Each test binary uses a subset of the fixtures.")]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use requirement_gate_config::ConfigSources;
use tempfile::TempDir;

/// Temporary home and project directories.
pub struct Layout {
    /// Owns the temporary tree.
    pub root: TempDir,
}

impl Layout {
    /// Creates an empty layout.
    pub fn new() -> Result<Self, String> {
        let root = tempfile::tempdir().map_err(|err| err.to_string())?;
        fs::create_dir_all(root.path().join("home/.claude")).map_err(|err| err.to_string())?;
        fs::create_dir_all(root.path().join("project/.claude")).map_err(|err| err.to_string())?;
        Ok(Self {
            root,
        })
    }

    /// Returns the project root.
    pub fn project(&self) -> PathBuf {
        self.root.path().join("project")
    }

    /// Writes the global document.
    pub fn global(&self, file: &str, body: &str) -> Result<PathBuf, String> {
        write(&self.root.path().join("home/.claude").join(file), body)
    }

    /// Writes a document under the project's `.claude` directory.
    pub fn project_doc(&self, file: &str, body: &str) -> Result<PathBuf, String> {
        write(&self.project().join(".claude").join(file), body)
    }

    /// Builds sources from the written documents.
    pub fn sources(&self, global: Option<PathBuf>) -> ConfigSources {
        let discovered = ConfigSources::discover(&self.project());
        ConfigSources {
            global,
            project: discovered.project,
            local: discovered.local,
        }
    }
}

/// Writes a file and returns its path.
fn write(path: &Path, body: &str) -> Result<PathBuf, String> {
    fs::write(path, body).map_err(|err| err.to_string())?;
    Ok(path.to_path_buf())
}
