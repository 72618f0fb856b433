// crates/requirement-gate-config/src/resolve.rs
// ============================================================================
// Module: Configuration Resolver
// Description: Document discovery and layered precedence.
// Purpose: Produce the effective configuration for a project, never failing.
// Dependencies: dirs
// ============================================================================

//! ## Overview
//! Up to three documents are combined: the global document is the base, the
//! project document merges on top (or replaces the base when it declares
//! `inherit: false`), and the project-local document always merges last.
//! Missing documents are skipped; unreadable or malformed ones degrade to
//! empty layers with a warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::path::Path;
use std::path::PathBuf;

use crate::document::ConfigWarning;
use crate::document::DocumentFormat;
use crate::document::layer_from_value;
use crate::document::read_document;
use crate::effective::EffectiveConfig;
use crate::layer::ConfigLayer;
use crate::layer::Merge;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable overriding the global document path.
pub const GLOBAL_CONFIG_ENV_VAR: &str = "REQUIREMENT_GATE_GLOBAL_CONFIG";
/// Environment variable that disables every gating operation when set to `1`.
pub const SKIP_ENV_VAR: &str = "REQUIREMENT_GATE_SKIP";
/// Configuration directory name under home and project roots.
const CONFIG_DIR: &str = ".claude";
/// Shared document stem.
const DOCUMENT_STEM: &str = "requirements";
/// Personal override document stem.
const LOCAL_DOCUMENT_STEM: &str = "requirements.local";

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Document locations, in ascending precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    /// Global document.
    pub global: Option<PathBuf>,
    /// Project document.
    pub project: Option<PathBuf>,
    /// Project-local document.
    pub local: Option<PathBuf>,
}

impl ConfigSources {
    /// Discovers documents for a project root.
    ///
    /// The global path comes from [`GLOBAL_CONFIG_ENV_VAR`] when set, otherwise
    /// from the home directory.
    #[must_use]
    pub fn discover(project_root: &Path) -> Self {
        let global = env::var_os(GLOBAL_CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .filter(|path| path.is_file())
            .or_else(|| dirs::home_dir().and_then(|home| find_document(&home.join(CONFIG_DIR), DOCUMENT_STEM)));
        let project_dir = project_root.join(CONFIG_DIR);
        Self {
            global,
            project: find_document(&project_dir, DOCUMENT_STEM),
            local: find_document(&project_dir, LOCAL_DOCUMENT_STEM),
        }
    }

    /// Returns the present sources in ascending precedence.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        [&self.global, &self.project, &self.local].into_iter().flatten().map(PathBuf::as_path).collect()
    }
}

/// Returns the first existing `<dir>/<stem>.<ext>` across supported extensions.
fn find_document(dir: &Path, stem: &str) -> Option<PathBuf> {
    DocumentFormat::EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Effective configuration together with its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Finalized configuration.
    pub config: EffectiveConfig,
    /// Findings from loading and finalizing, in discovery order.
    pub warnings: Vec<ConfigWarning>,
    /// Documents that were consulted.
    pub sources: ConfigSources,
}

/// Discovers and resolves the configuration for a project root.
#[must_use]
pub fn resolve(project_root: &Path) -> ResolvedConfig {
    resolve_sources(ConfigSources::discover(project_root))
}

/// Resolves explicit document locations.
#[must_use]
pub fn resolve_sources(sources: ConfigSources) -> ResolvedConfig {
    let mut warnings = Vec::new();
    let global = load_layer(sources.global.as_deref(), &mut warnings);
    let project = load_layer(sources.project.as_deref(), &mut warnings);
    let local = load_layer(sources.local.as_deref(), &mut warnings);
    let merged = merge_layers(global, project, local);
    let (config, finalize_warnings) = EffectiveConfig::from_layer(merged);
    warnings.extend(finalize_warnings);
    ResolvedConfig {
        config,
        warnings,
        sources,
    }
}

/// Applies the precedence rules to three layers.
#[must_use]
pub fn merge_layers(global: ConfigLayer, project: ConfigLayer, local: ConfigLayer) -> ConfigLayer {
    let mut merged = if project.inherit == Some(false) {
        project
    } else {
        let mut base = global;
        base.merge(project);
        base
    };
    merged.merge(local);
    merged
}

/// Loads one optional document, degrading failures to an empty layer.
fn load_layer(path: Option<&Path>, warnings: &mut Vec<ConfigWarning>) -> ConfigLayer {
    let Some(path) = path else {
        return ConfigLayer::default();
    };
    match read_document(path).and_then(|value| layer_from_value(value, Some(path))) {
        Ok(loaded) => {
            warnings.extend(loaded.warnings);
            loaded.layer
        }
        Err(err) => {
            warnings.push(ConfigWarning::new(Some(path), "", format!("{err}; document ignored")));
            ConfigLayer::default()
        }
    }
}

/// Returns true when [`SKIP_ENV_VAR`] requests that gating be bypassed.
#[must_use]
pub fn skip_requested() -> bool {
    env::var(SKIP_ENV_VAR).is_ok_and(|value| matches!(value.trim(), "1" | "true" | "yes"))
}
