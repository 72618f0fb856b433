// crates/requirement-gate-config/src/document.rs
// ============================================================================
// Module: Configuration Documents
// Description: Bounded loading, format detection, and unknown-key detection.
// Purpose: Turn one YAML or TOML file into a typed layer plus warnings.
// Dependencies: serde_json, serde_yaml, toml, thiserror
// ============================================================================

//! ## Overview
//! Documents are read with a hard size limit, parsed into a format-neutral
//! JSON value, walked against the known key sets, and finally deserialized
//! into a [`ConfigLayer`]. Requirement definitions are deserialized one at a
//! time so a single malformed definition is dropped with a warning instead of
//! discarding the whole document.
//!
//! Security posture: configuration is untrusted input; reads are bounded and
//! paths are length-checked before touching the filesystem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::layer::CACHE_KEYS;
use crate::layer::ConfigLayer;
use crate::layer::HOOKS_KEYS;
use crate::layer::LOGGING_KEYS;
use crate::layer::REQUIREMENT_KEYS;
use crate::layer::RequirementLayer;
use crate::layer::STOP_HOOK_KEYS;
use crate::layer::THRESHOLD_KEYS;
use crate::layer::TOP_LEVEL_KEYS;
use crate::layer::TRIGGER_KEYS;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a configuration document in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a configuration path string.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors and Warnings
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading a document.
    #[error("config io error: {0}")]
    Io(String),
    /// Document could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Document failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Non-fatal configuration finding.
///
/// # Invariants
/// - `path` is a dotted key path inside the document, empty for the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Document the finding refers to, when known.
    pub source: Option<PathBuf>,
    /// Dotted key path.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl ConfigWarning {
    /// Creates a warning.
    #[must_use]
    pub fn new(source: Option<&Path>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.map(Path::to_path_buf),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{}: ", source.display())?;
        }
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Supported document syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML (`.yaml`, `.yml`).
    Yaml,
    /// TOML (`.toml`).
    Toml,
}

impl DocumentFormat {
    /// File extensions tried during discovery, in preference order.
    pub const EXTENSIONS: &'static [&'static str] = &["yaml", "yml", "toml"];

    /// Selects the format from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parses document text into a format-neutral value.
///
/// An empty document parses to `null`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the text is not valid for the format.
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Value, ConfigError> {
    match format {
        DocumentFormat::Yaml => {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_yaml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
        }
        DocumentFormat::Toml => {
            let table: toml::Table = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
            serde_json::to_value(table).map_err(|err| ConfigError::Parse(err.to_string()))
        }
    }
}

/// Reads and parses a document from disk.
///
/// # Errors
///
/// Returns [`ConfigError`] when the path is invalid, the file cannot be read,
/// exceeds [`MAX_CONFIG_FILE_SIZE`], is not UTF-8, or fails to parse.
pub fn read_document(path: &Path) -> Result<Value, ConfigError> {
    validate_path(path)?;
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| ConfigError::Invalid(format!("unsupported config extension: {}", path.display())))?;
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let text = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
    parse_document(text, format)
}

/// Validates path length limits before reading.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let path_str = path.to_string_lossy();
    if path_str.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Typed Conversion
// ============================================================================

/// A document converted to a typed layer.
#[derive(Debug, Clone, Default)]
pub struct LoadedLayer {
    /// Typed partial configuration.
    pub layer: ConfigLayer,
    /// Findings raised while converting.
    pub warnings: Vec<ConfigWarning>,
}

/// Converts a parsed document into a typed layer.
///
/// Unknown keys and malformed requirement definitions become warnings.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the root is not a mapping or a
/// top-level section has the wrong shape.
pub fn layer_from_value(value: Value, source: Option<&Path>) -> Result<LoadedLayer, ConfigError> {
    let mut root = match value {
        Value::Null => return Ok(LoadedLayer::default()),
        Value::Object(map) => map,
        _ => return Err(ConfigError::Invalid("config document must be a mapping".to_string())),
    };
    let mut warnings = Vec::new();
    flag_unknown(&root, TOP_LEVEL_KEYS, "", source, &mut warnings);
    for (section, known) in [("logging", LOGGING_KEYS), ("cache", CACHE_KEYS), ("hooks", HOOKS_KEYS)] {
        if let Some(Value::Object(map)) = root.get(section) {
            flag_unknown(map, known, section, source, &mut warnings);
        }
    }
    if let Some(Value::Object(stop)) = root.get("hooks").and_then(|hooks| hooks.get("stop")) {
        flag_unknown(stop, STOP_HOOK_KEYS, "hooks.stop", source, &mut warnings);
    }

    let requirements = root.remove("requirements");
    let mut layer: ConfigLayer =
        serde_json::from_value(Value::Object(root)).map_err(|err| ConfigError::Invalid(err.to_string()))?;

    match requirements {
        None | Some(Value::Null) => {}
        Some(Value::Object(definitions)) => {
            for (name, definition) in definitions {
                if let Some(requirement) = requirement_from_value(&name, definition, source, &mut warnings) {
                    layer.requirements.insert(name, requirement);
                }
            }
        }
        Some(_) => {
            warnings.push(ConfigWarning::new(source, "requirements", "expected a mapping; section ignored"));
        }
    }
    Ok(LoadedLayer {
        layer,
        warnings,
    })
}

/// Converts one requirement definition, recording findings.
fn requirement_from_value(
    name: &str,
    definition: Value,
    source: Option<&Path>,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<RequirementLayer> {
    let path = format!("requirements.{name}");
    let Value::Object(map) = &definition else {
        warnings.push(ConfigWarning::new(source, path, "expected a mapping; definition ignored"));
        return None;
    };
    flag_unknown(map, REQUIREMENT_KEYS, &path, source, warnings);
    if let Some(Value::Object(thresholds)) = map.get("thresholds") {
        flag_unknown(thresholds, THRESHOLD_KEYS, &format!("{path}.thresholds"), source, warnings);
    }
    if let Some(Value::Array(entries)) = map.get("trigger_tools") {
        for (index, entry) in entries.iter().enumerate() {
            if let Value::Object(rule) = entry {
                flag_unknown(rule, TRIGGER_KEYS, &format!("{path}.trigger_tools[{index}]"), source, warnings);
            }
        }
    }
    match serde_json::from_value(definition) {
        Ok(requirement) => Some(requirement),
        Err(err) => {
            warnings.push(ConfigWarning::new(source, path, format!("definition ignored: {err}")));
            None
        }
    }
}

/// Records a warning for every key not in `known`.
fn flag_unknown(
    map: &Map<String, Value>,
    known: &[&str],
    prefix: &str,
    source: Option<&Path>,
    warnings: &mut Vec<ConfigWarning>,
) {
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
            warnings.push(ConfigWarning::new(source, path, "unknown key ignored"));
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test fixtures use explicit expects for clarity.")]

    use super::DocumentFormat;
    use super::layer_from_value;
    use super::parse_document;

    #[test]
    fn yaml_and_toml_produce_the_same_layer() {
        let yaml = "enabled: true\nrequirements:\n  commit_plan:\n    type: blocking\n    scope: session\n";
        let toml = "enabled = true\n[requirements.commit_plan]\ntype = \"blocking\"\nscope = \"session\"\n";
        let from_yaml = layer_from_value(parse_document(yaml, DocumentFormat::Yaml).expect("yaml"), None)
            .expect("yaml layer");
        let from_toml = layer_from_value(parse_document(toml, DocumentFormat::Toml).expect("toml"), None)
            .expect("toml layer");
        assert_eq!(from_yaml.layer, from_toml.layer);
        assert!(from_yaml.warnings.is_empty());
    }

    #[test]
    fn empty_yaml_is_an_empty_layer() {
        let value = parse_document("  \n", DocumentFormat::Yaml).expect("parse");
        let loaded = layer_from_value(value, None).expect("layer");
        assert!(loaded.layer.requirements.is_empty());
    }

    #[test]
    fn unknown_keys_are_flagged_with_paths() {
        let yaml = "enabeld: true\nrequirements:\n  adr:\n    type: blocking\n    scpoe: branch\n    thresholds:\n      stop: 3\n";
        let loaded = layer_from_value(parse_document(yaml, DocumentFormat::Yaml).expect("parse"), None)
            .expect("layer");
        let paths: Vec<&str> = loaded.warnings.iter().map(|warning| warning.path.as_str()).collect();
        assert!(paths.contains(&"enabeld"));
        assert!(paths.contains(&"requirements.adr.scpoe"));
        assert!(paths.contains(&"requirements.adr.thresholds.stop"));
        assert!(loaded.layer.requirements.contains_key("adr"));
    }

    #[test]
    fn malformed_definition_is_dropped_alone() {
        let yaml = "requirements:\n  good:\n    type: blocking\n  bad:\n    enabled: maybe\n";
        let loaded = layer_from_value(parse_document(yaml, DocumentFormat::Yaml).expect("parse"), None)
            .expect("layer");
        assert!(loaded.layer.requirements.contains_key("good"));
        assert!(!loaded.layer.requirements.contains_key("bad"));
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn non_mapping_root_is_invalid() {
        let value = parse_document("- a\n- b\n", DocumentFormat::Yaml).expect("parse");
        assert!(layer_from_value(value, None).is_err());
    }
}
