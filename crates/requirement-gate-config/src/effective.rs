// crates/requirement-gate-config/src/effective.rs
// ============================================================================
// Module: Effective Configuration
// Description: Finalization of the merged layer tree into typed settings.
// Purpose: Give the gate typed requirement specs and ambient settings.
// Dependencies: requirement-gate-core, serde, serde_json, dirs
// ============================================================================

//! ## Overview
//! [`EffectiveConfig`] is built once from the merged [`ConfigLayer`]. Every
//! requirement definition is finalized into a [`RequirementSpec`]; those that
//! cannot be (unknown type or scope, dynamic without a calculator or block
//! threshold, guard without a guard type) are dropped with a warning. Invalid
//! trigger or clear patterns are dropped individually, so they never match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::str::FromStr;

use requirement_gate_core::CalculatorKind;
use requirement_gate_core::CheckSettings;
use requirement_gate_core::CommandPattern;
use requirement_gate_core::DEFAULT_BASE_BRANCH;
use requirement_gate_core::DEFAULT_CALCULATION_TTL_SECS;
use requirement_gate_core::DEFAULT_PROTECTED_BRANCHES;
use requirement_gate_core::DEFAULT_SESSION_STALE_SECS;
use requirement_gate_core::DEFAULT_SINGLE_USE_CLEAR_PATTERN;
use requirement_gate_core::DynamicSpec;
use requirement_gate_core::EventLevel;
use requirement_gate_core::GuardKind;
use requirement_gate_core::GuardSpec;
use requirement_gate_core::RequirementKind;
use requirement_gate_core::RequirementSpec;
use requirement_gate_core::RequirementType;
use requirement_gate_core::Scope;
use requirement_gate_core::Thresholds;
use requirement_gate_core::TriggerPredicate;
use requirement_gate_core::TriggerRule;
use requirement_gate_core::runtime::DEFAULT_DEDUP_TTL_SECS;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::ConfigWarning;
use crate::layer::ConfigLayer;
use crate::layer::LoggingLayer;
use crate::layer::RequirementLayer;
use crate::layer::StopHookLayer;
use crate::layer::TriggerToolLayer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event log location relative to the home directory.
const DEFAULT_EVENT_LOG: &str = ".claude/requirement-gate/events.jsonl";

// ============================================================================
// SECTION: Ambient Settings
// ============================================================================

/// Where gate events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Append JSON lines to [`LoggingSettings::file`].
    File,
    /// Write JSON lines to stderr.
    Stderr,
    /// Discard events.
    Disabled,
}

impl FromStr for LogDestination {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "stderr" => Ok(Self::Stderr),
            "none" | "off" => Ok(Self::Disabled),
            other => Err(format!("unknown log destination: {other}")),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Minimum recorded level.
    pub level: EventLevel,
    /// Event destination.
    pub destination: LogDestination,
    /// Event log path; `None` when no home directory is known.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: EventLevel::Warn,
            destination: LogDestination::File,
            file: dirs::home_dir().map(|home| home.join(DEFAULT_EVENT_LOG)),
        }
    }
}

/// Resolved stop-hook settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopHookSettings {
    /// Whether the stop hook verifies requirements at all.
    pub verify_requirements: bool,
    /// Scopes the stop query is restricted to.
    pub verify_scopes: Vec<Scope>,
}

impl Default for StopHookSettings {
    fn default() -> Self {
        Self {
            verify_requirements: true,
            verify_scopes: vec![Scope::Session],
        }
    }
}

// ============================================================================
// SECTION: Effective Configuration
// ============================================================================

/// Typed view over the merged configuration.
///
/// # Invariants
/// - `requirements` holds only definitions that finalized successfully.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Merged partial tree, kept for attribute lookups and display.
    layer: ConfigLayer,
    /// Finalized requirement specs in name order.
    requirements: Vec<RequirementSpec>,
    /// Logging settings.
    logging: LoggingSettings,
    /// Stop hook settings.
    stop_hook: StopHookSettings,
    /// Dedup window (seconds).
    dedup_ttl_secs: u64,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::from_layer(ConfigLayer::default()).0
    }
}

impl EffectiveConfig {
    /// Finalizes a merged layer.
    ///
    /// Returns the effective configuration and the findings raised while
    /// finalizing.
    #[must_use]
    pub fn from_layer(layer: ConfigLayer) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let requirements = layer
            .requirements
            .iter()
            .filter_map(|(name, definition)| finalize_requirement(name, definition, &mut warnings))
            .collect();
        let logging = finalize_logging(&layer.logging, &mut warnings);
        let stop_hook = finalize_stop_hook(&layer.hooks.stop, &mut warnings);
        let dedup_ttl_secs = layer.cache.dedup_ttl_seconds.unwrap_or(DEFAULT_DEDUP_TTL_SECS);
        let config = Self {
            layer,
            requirements,
            logging,
            stop_hook,
            dedup_ttl_secs,
        };
        (config, warnings)
    }

    /// Returns true unless the configuration disables the gate globally.
    #[must_use]
    pub fn is_globally_enabled(&self) -> bool {
        self.layer.enabled.unwrap_or(true)
    }

    /// Returns every finalized requirement.
    #[must_use]
    pub fn requirements(&self) -> &[RequirementSpec] {
        &self.requirements
    }

    /// Returns the finalized requirement with the given name.
    #[must_use]
    pub fn requirement(&self, name: &str) -> Option<&RequirementSpec> {
        self.requirements.iter().find(|spec| spec.name.as_str() == name)
    }

    /// Returns true when the gate and the named requirement are both enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.is_globally_enabled() && self.requirement(name).is_some_and(|spec| spec.enabled)
    }

    /// Returns the scope of the named requirement.
    #[must_use]
    pub fn scope(&self, name: &str) -> Option<Scope> {
        self.requirement(name).map(|spec| spec.scope)
    }

    /// Returns the type of the named requirement.
    #[must_use]
    pub fn requirement_type(&self, name: &str) -> Option<RequirementType> {
        self.requirement(name).map(RequirementSpec::requirement_type)
    }

    /// Returns the trigger predicate of the named requirement.
    #[must_use]
    pub fn trigger(&self, name: &str) -> Option<&TriggerPredicate> {
        self.requirement(name).map(|spec| &spec.trigger)
    }

    /// Returns a raw attribute of a requirement definition, or `default`
    /// when the attribute is absent or has a different shape.
    #[must_use]
    pub fn attribute_or<T: DeserializeOwned>(&self, name: &str, key: &str, default: T) -> T {
        self.layer
            .requirements
            .get(name)
            .and_then(|definition| serde_json::to_value(definition).ok())
            .and_then(|mut value| value.get_mut(key).map(Value::take))
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(default)
    }

    /// Returns the checker settings.
    #[must_use]
    pub fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            enabled: self.is_globally_enabled(),
            dedup_ttl_secs: self.dedup_ttl_secs,
        }
    }

    /// Returns the logging settings.
    #[must_use]
    pub const fn logging(&self) -> &LoggingSettings {
        &self.logging
    }

    /// Returns the stop hook settings.
    #[must_use]
    pub const fn stop_hook(&self) -> &StopHookSettings {
        &self.stop_hook
    }

    /// Returns the dedup window in seconds.
    #[must_use]
    pub const fn dedup_ttl_secs(&self) -> u64 {
        self.dedup_ttl_secs
    }

    /// Returns the merged partial tree.
    #[must_use]
    pub const fn layer(&self) -> &ConfigLayer {
        &self.layer
    }
}

// ============================================================================
// SECTION: Finalization
// ============================================================================

/// Finalizes one requirement definition.
fn finalize_requirement(
    name: &str,
    definition: &RequirementLayer,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<RequirementSpec> {
    let path = format!("requirements.{name}");
    let scope = match definition.scope.as_deref().map(Scope::from_str).transpose() {
        Ok(scope) => scope.unwrap_or(Scope::Session),
        Err(err) => {
            warnings.push(ConfigWarning::new(None, format!("{path}.scope"), format!("{err}; requirement dropped")));
            return None;
        }
    };
    let kind = match definition.requirement_type.as_deref() {
        Some("blocking") => RequirementKind::Blocking,
        Some("dynamic") => RequirementKind::Dynamic(finalize_dynamic(&path, definition, warnings)?),
        Some("guard") => RequirementKind::Guard(finalize_guard(&path, definition, warnings)?),
        Some(other) => {
            warnings.push(ConfigWarning::new(
                None,
                format!("{path}.type"),
                format!("unknown requirement type {other}; requirement dropped"),
            ));
            return None;
        }
        None => {
            warnings.push(ConfigWarning::new(None, path, "missing type; requirement dropped"));
            return None;
        }
    };

    let trigger = definition.trigger_tools.as_ref().map_or_else(TriggerPredicate::default_tools, |entries| {
        TriggerPredicate {
            rules: entries.iter().filter_map(|entry| finalize_trigger(&path, entry, warnings)).collect(),
        }
    });

    let mut clear_on = Vec::new();
    for source in definition.clear_on.iter().flatten() {
        match CommandPattern::new(source.as_str()) {
            Ok(pattern) => clear_on.push(pattern),
            Err(err) => {
                warnings.push(ConfigWarning::new(None, format!("{path}.clear_on"), format!("invalid pattern: {err}")));
            }
        }
    }
    if definition.clear_on.is_none()
        && scope == Scope::SingleUse
        && let Ok(pattern) = CommandPattern::new(DEFAULT_SINGLE_USE_CLEAR_PATTERN)
    {
        clear_on.push(pattern);
    }

    Some(RequirementSpec {
        name: name.into(),
        kind,
        scope,
        enabled: definition.enabled.unwrap_or(true),
        trigger,
        message: definition.message.clone(),
        checklist: definition.checklist.clone().unwrap_or_default(),
        satisfied_by_skills: definition.satisfied_by_skills.clone().unwrap_or_default(),
        clear_on,
    })
}

/// Finalizes one trigger entry; invalid patterns drop the entry.
fn finalize_trigger(path: &str, entry: &TriggerToolLayer, warnings: &mut Vec<ConfigWarning>) -> Option<TriggerRule> {
    match entry {
        TriggerToolLayer::Tool(tool) => Some(TriggerRule::tool(tool.as_str())),
        TriggerToolLayer::Rule {
            tool,
            command_pattern: None,
        } => Some(TriggerRule::tool(tool.as_str())),
        TriggerToolLayer::Rule {
            tool,
            command_pattern: Some(source),
        } => match CommandPattern::new(source.as_str()) {
            Ok(pattern) => Some(TriggerRule {
                tool: tool.clone(),
                command_pattern: Some(pattern),
            }),
            Err(err) => {
                warnings.push(ConfigWarning::new(
                    None,
                    format!("{path}.trigger_tools"),
                    format!("invalid command_pattern for {tool}: {err}"),
                ));
                None
            }
        },
    }
}

/// Finalizes dynamic attributes.
fn finalize_dynamic(path: &str, definition: &RequirementLayer, warnings: &mut Vec<ConfigWarning>) -> Option<DynamicSpec> {
    let Some(calculator) = definition.calculator.as_deref() else {
        warnings.push(ConfigWarning::new(None, path, "dynamic requirement without calculator; requirement dropped"));
        return None;
    };
    let Some(block) = definition.thresholds.and_then(|thresholds| thresholds.block) else {
        warnings.push(ConfigWarning::new(None, path, "dynamic requirement without thresholds.block; requirement dropped"));
        return None;
    };
    let calculator = CalculatorKind::from_id(calculator);
    if let CalculatorKind::Unknown(id) = &calculator {
        warnings.push(ConfigWarning::new(None, path, format!("unknown calculator {id}; requirement dropped")));
        return None;
    }
    Some(DynamicSpec {
        calculator,
        thresholds: Thresholds {
            warn: definition.thresholds.and_then(|thresholds| thresholds.warn),
            block,
        },
        cache_ttl: definition.cache_ttl.unwrap_or(DEFAULT_CALCULATION_TTL_SECS),
        base_branch: definition.base_branch.clone().unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
        approval_ttl: definition.approval_ttl,
    })
}

/// Finalizes guard attributes.
fn finalize_guard(path: &str, definition: &RequirementLayer, warnings: &mut Vec<ConfigWarning>) -> Option<GuardSpec> {
    let Some(guard) = definition.guard_type.as_deref() else {
        warnings.push(ConfigWarning::new(None, path, "guard requirement without guard_type; requirement dropped"));
        return None;
    };
    Some(GuardSpec {
        guard: GuardKind::from_id(guard),
        protected_branches: definition
            .protected_branches
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTECTED_BRANCHES.iter().map(ToString::to_string).collect()),
        stale_after_seconds: definition.stale_after_seconds.unwrap_or(DEFAULT_SESSION_STALE_SECS),
        approval_ttl: definition.approval_ttl,
    })
}

/// Finalizes the logging section.
fn finalize_logging(layer: &LoggingLayer, warnings: &mut Vec<ConfigWarning>) -> LoggingSettings {
    let mut settings = LoggingSettings::default();
    if let Some(level) = layer.level.as_deref() {
        match EventLevel::from_str(level) {
            Ok(level) => settings.level = level,
            Err(err) => warnings.push(ConfigWarning::new(None, "logging.level", err)),
        }
    }
    if let Some(destination) = layer.destination.as_deref() {
        match LogDestination::from_str(destination) {
            Ok(destination) => settings.destination = destination,
            Err(err) => warnings.push(ConfigWarning::new(None, "logging.destination", err)),
        }
    }
    if let Some(file) = layer.file.as_deref() {
        settings.file = Some(expand_home(file));
    }
    settings
}

/// Finalizes the stop hook section.
fn finalize_stop_hook(layer: &StopHookLayer, warnings: &mut Vec<ConfigWarning>) -> StopHookSettings {
    let mut settings = StopHookSettings::default();
    if let Some(verify) = layer.verify_requirements {
        settings.verify_requirements = verify;
    }
    if let Some(labels) = &layer.verify_scopes {
        settings.verify_scopes = labels
            .iter()
            .filter_map(|label| match Scope::from_str(label) {
                Ok(scope) => Some(scope),
                Err(err) => {
                    warnings.push(ConfigWarning::new(None, "hooks.stop.verify_scopes", err));
                    None
                }
            })
            .collect();
    }
    settings
}

/// Expands a leading `~/` against the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
