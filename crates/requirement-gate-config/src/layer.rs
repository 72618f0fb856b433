// crates/requirement-gate-config/src/layer.rs
// ============================================================================
// Module: Configuration Layers
// Description: Typed partial configuration tree and its recursive merge.
// Purpose: Merge global, project, and local documents without loose maps.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each configuration document deserializes into a [`ConfigLayer`] in which
//! every leaf is optional. [`Merge::merge`] lays an override on top of a base:
//! nested sections and the requirement map merge recursively, while scalars
//! and lists present in the override replace the base outright.
//!
//! Invariants:
//! - Merging an empty layer is the identity.
//! - Merge is associative, so three layers fold the same way in any grouping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Merge Contract
// ============================================================================

/// Recursive override merge.
pub trait Merge {
    /// Lays `over` on top of `self`.
    fn merge(&mut self, over: Self);
}

/// Replaces `base` when `over` carries a value.
fn replace<T>(base: &mut Option<T>, over: Option<T>) {
    if over.is_some() {
        *base = over;
    }
}

// ============================================================================
// SECTION: Document Layer
// ============================================================================

/// Key names accepted at the top level of a configuration document.
pub const TOP_LEVEL_KEYS: &[&str] = &["version", "enabled", "inherit", "requirements", "logging", "hooks", "cache"];

/// One configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigLayer {
    /// Document format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    /// Global enforcement switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Project documents only: false replaces the global layer instead of merging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<bool>,
    /// Requirement definitions keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requirements: BTreeMap<String, RequirementLayer>,
    /// Event logging settings.
    #[serde(default)]
    pub logging: LoggingLayer,
    /// Host hook settings.
    #[serde(default)]
    pub hooks: HooksLayer,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheLayer,
}

impl Merge for ConfigLayer {
    fn merge(&mut self, over: Self) {
        replace(&mut self.version, over.version);
        replace(&mut self.enabled, over.enabled);
        replace(&mut self.inherit, over.inherit);
        for (name, requirement) in over.requirements {
            match self.requirements.get_mut(&name) {
                Some(base) => base.merge(requirement),
                None => {
                    self.requirements.insert(name, requirement);
                }
            }
        }
        self.logging.merge(over.logging);
        self.hooks.merge(over.hooks);
        self.cache.merge(over.cache);
    }
}

// ============================================================================
// SECTION: Requirement Layer
// ============================================================================

/// Key names accepted inside a requirement definition.
pub const REQUIREMENT_KEYS: &[&str] = &[
    "enabled",
    "type",
    "scope",
    "message",
    "checklist",
    "trigger_tools",
    "satisfied_by_skills",
    "clear_on",
    "calculator",
    "thresholds",
    "cache_ttl",
    "base_branch",
    "approval_ttl",
    "guard_type",
    "protected_branches",
    "stale_after_seconds",
];

/// Key names accepted inside an object-form trigger entry.
pub const TRIGGER_KEYS: &[&str] = &["tool", "command_pattern"];

/// Key names accepted inside `thresholds`.
pub const THRESHOLD_KEYS: &[&str] = &["warn", "block"];

/// Partial requirement definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementLayer {
    /// Whether the requirement is enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Requirement type label.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub requirement_type: Option<String>,
    /// Scope label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Denial message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Checklist lines appended to the denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
    /// Trigger entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_tools: Option<Vec<TriggerToolLayer>>,
    /// Skills whose completion satisfies the requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfied_by_skills: Option<Vec<String>>,
    /// Command patterns clearing single-use satisfaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_on: Option<Vec<String>>,
    /// Dynamic: calculator identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculator: Option<String>,
    /// Dynamic: thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdsLayer>,
    /// Dynamic: calculation cache TTL (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
    /// Dynamic: base branch for diffs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    /// Dynamic and guard: approval TTL (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_ttl: Option<u64>,
    /// Guard: guard identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard_type: Option<String>,
    /// Guard: protected branch names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected_branches: Option<Vec<String>>,
    /// Guard: session staleness window (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_after_seconds: Option<u64>,
}

impl Merge for RequirementLayer {
    fn merge(&mut self, over: Self) {
        replace(&mut self.enabled, over.enabled);
        replace(&mut self.requirement_type, over.requirement_type);
        replace(&mut self.scope, over.scope);
        replace(&mut self.message, over.message);
        replace(&mut self.checklist, over.checklist);
        replace(&mut self.trigger_tools, over.trigger_tools);
        replace(&mut self.satisfied_by_skills, over.satisfied_by_skills);
        replace(&mut self.clear_on, over.clear_on);
        replace(&mut self.calculator, over.calculator);
        if let Some(thresholds) = over.thresholds {
            self.thresholds.get_or_insert_with(ThresholdsLayer::default).merge(thresholds);
        }
        replace(&mut self.cache_ttl, over.cache_ttl);
        replace(&mut self.base_branch, over.base_branch);
        replace(&mut self.approval_ttl, over.approval_ttl);
        replace(&mut self.guard_type, over.guard_type);
        replace(&mut self.protected_branches, over.protected_branches);
        replace(&mut self.stale_after_seconds, over.stale_after_seconds);
    }
}

/// Trigger entry: a bare tool name or a tool with a command pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerToolLayer {
    /// Bare tool name.
    Tool(String),
    /// Tool restricted to targets matching a pattern.
    Rule {
        /// Tool name.
        tool: String,
        /// Optional regular expression matched against the target.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command_pattern: Option<String>,
    },
}

/// Partial threshold pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsLayer {
    /// Warning threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<f64>,
    /// Blocking threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<f64>,
}

impl Merge for ThresholdsLayer {
    fn merge(&mut self, over: Self) {
        replace(&mut self.warn, over.warn);
        replace(&mut self.block, over.block);
    }
}

// ============================================================================
// SECTION: Ambient Sections
// ============================================================================

/// Key names accepted inside `logging`.
pub const LOGGING_KEYS: &[&str] = &["level", "destination", "file"];

/// Partial logging section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingLayer {
    /// Minimum level label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Destination label (`file`, `stderr`, `none`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Event log path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Merge for LoggingLayer {
    fn merge(&mut self, over: Self) {
        replace(&mut self.level, over.level);
        replace(&mut self.destination, over.destination);
        replace(&mut self.file, over.file);
    }
}

/// Key names accepted inside `hooks`.
pub const HOOKS_KEYS: &[&str] = &["stop"];

/// Key names accepted inside `hooks.stop`.
pub const STOP_HOOK_KEYS: &[&str] = &["verify_requirements", "verify_scopes"];

/// Partial hooks section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HooksLayer {
    /// Stop hook settings.
    #[serde(default)]
    pub stop: StopHookLayer,
}

impl Merge for HooksLayer {
    fn merge(&mut self, over: Self) {
        self.stop.merge(over.stop);
    }
}

/// Partial stop hook section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopHookLayer {
    /// Whether stop verification runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_requirements: Option<bool>,
    /// Scope labels verified at stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_scopes: Option<Vec<String>>,
}

impl Merge for StopHookLayer {
    fn merge(&mut self, over: Self) {
        replace(&mut self.verify_requirements, over.verify_requirements);
        replace(&mut self.verify_scopes, over.verify_scopes);
    }
}

/// Key names accepted inside `cache`.
pub const CACHE_KEYS: &[&str] = &["dedup_ttl_seconds"];

/// Partial cache section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLayer {
    /// Dedup window (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_ttl_seconds: Option<u64>,
}

impl Merge for CacheLayer {
    fn merge(&mut self, over: Self) {
        replace(&mut self.dedup_ttl_seconds, over.dedup_ttl_seconds);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
