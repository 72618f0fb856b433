// crates/requirement-gate-core/src/core/spec.rs
// ============================================================================
// Module: Requirement Definitions
// Description: Typed requirement definitions produced by configuration resolution.
// Purpose: Give strategies a closed, validated view of each requirement.
// Dependencies: crate::core::identifiers, regex, serde
// ============================================================================

//! ## Overview
//! A [`RequirementSpec`] is built fresh on every configuration resolution and
//! never persisted. Type-specific attributes live in [`RequirementKind`], so a
//! strategy only ever sees the attributes that apply to it. Guard and
//! calculator identifiers are closed enums with an explicit `Unknown` variant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::BranchName;
use crate::core::identifiers::RequirementName;
use crate::core::identifiers::SessionId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tools that trigger a requirement when no explicit trigger list is configured.
pub const DEFAULT_TRIGGER_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit"];
/// Command pattern that clears single-use requirements by default.
pub const DEFAULT_SINGLE_USE_CLEAR_PATTERN: &str = r"\bgit\s+commit\b";
/// Default calculation cache TTL for dynamic requirements (seconds).
pub const DEFAULT_CALCULATION_TTL_SECS: u64 = 30;
/// Default base branch for diff-based calculators.
pub const DEFAULT_BASE_BRANCH: &str = "main";
/// Default protected branch list for the protected-branch guard.
pub const DEFAULT_PROTECTED_BRANCHES: &[&str] = &["main", "master"];
/// Default staleness window for the single-session guard (seconds).
pub const DEFAULT_SESSION_STALE_SECS: u64 = 7_200;

// ============================================================================
// SECTION: Scope and Type
// ============================================================================

/// Lifetime bucket for a requirement's satisfaction state.
///
/// # Invariants
/// - `Session` and `SingleUse` are stored per session id.
/// - `Branch` and `Permanent` are stored at branch level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Satisfaction lasts for one session.
    Session,
    /// Satisfaction lasts for the branch.
    Branch,
    /// Satisfaction lasts for the branch and is never cleared by lifecycle events.
    Permanent,
    /// Satisfaction lasts for one session until a clearing command runs.
    SingleUse,
}

impl Scope {
    /// Returns true when state for this scope is stored per session.
    #[must_use]
    pub const fn is_session_level(self) -> bool {
        matches!(self, Self::Session | Self::SingleUse)
    }

    /// Returns the stable label for the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Branch => "branch",
            Self::Permanent => "permanent",
            Self::SingleUse => "single_use",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "session" => Ok(Self::Session),
            "branch" => Ok(Self::Branch),
            "permanent" => Ok(Self::Permanent),
            "single_use" | "single-use" => Ok(Self::SingleUse),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// Evaluation strategy selector for a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    /// Satisfied only by explicit manual satisfaction.
    Blocking,
    /// Satisfied by comparing a computed value against thresholds.
    Dynamic,
    /// Satisfied by a stateless boolean condition.
    Guard,
}

impl RequirementType {
    /// Returns the stable label for the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Dynamic => "dynamic",
            Self::Guard => "guard",
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Patterns and Triggers
// ============================================================================

/// Compiled command pattern that remembers its source text.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    /// Source pattern text.
    source: String,
    /// Compiled regular expression.
    regex: Regex,
}

impl CommandPattern {
    /// Compiles a command pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the pattern is not a valid regular expression.
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self {
            source,
            regex,
        })
    }

    /// Returns the source pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true when the pattern matches anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for CommandPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// One trigger rule: a tool name plus an optional command pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    /// Tool (action kind) the rule applies to.
    pub tool: String,
    /// Optional pattern the action target must match.
    pub command_pattern: Option<CommandPattern>,
}

impl TriggerRule {
    /// Creates a rule matching every invocation of `tool`.
    #[must_use]
    pub fn tool(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            command_pattern: None,
        }
    }
}

/// Predicate deciding whether an action is relevant to a requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerPredicate {
    /// Rules combined with logical OR.
    pub rules: Vec<TriggerRule>,
}

impl TriggerPredicate {
    /// Returns the predicate for the default edit tools.
    #[must_use]
    pub fn default_tools() -> Self {
        Self {
            rules: DEFAULT_TRIGGER_TOOLS.iter().map(|tool| TriggerRule::tool(*tool)).collect(),
        }
    }

    /// Returns true when any rule matches the action.
    #[must_use]
    pub fn matches(&self, action: &ActionRequest) -> bool {
        self.rules.iter().any(|rule| {
            if rule.tool != action.kind {
                return false;
            }
            match &rule.command_pattern {
                None => true,
                Some(pattern) => action.target.as_deref().is_some_and(|target| pattern.is_match(target)),
            }
        })
    }
}

impl Default for TriggerPredicate {
    fn default() -> Self {
        Self::default_tools()
    }
}

// ============================================================================
// SECTION: Type-Specific Attributes
// ============================================================================

/// Built-in calculators for dynamic requirements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CalculatorKind {
    /// Lines added plus deleted relative to the base branch.
    BranchSize,
    /// Identifier with no registered calculator.
    Unknown(String),
}

impl CalculatorKind {
    /// Resolves a configured calculator identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            "branch_size" | "branch_size_calculator" => Self::BranchSize,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::BranchSize => "branch_size",
            Self::Unknown(id) => id,
        }
    }
}

/// Built-in guard conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GuardKind {
    /// Denies actions on protected branches.
    ProtectedBranch,
    /// Denies actions while another session is active on the same branch.
    SingleSessionPerBranch,
    /// Identifier with no registered guard condition.
    Unknown(String),
}

impl GuardKind {
    /// Resolves a configured guard identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            "protected_branch" => Self::ProtectedBranch,
            "single_session_per_branch" | "single_session" => Self::SingleSessionPerBranch,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProtectedBranch => "protected_branch",
            Self::SingleSessionPerBranch => "single_session_per_branch",
            Self::Unknown(id) => id,
        }
    }
}

/// Threshold pair for dynamic requirements.
///
/// # Invariants
/// - `warn`, when present, is compared with `>=` and only produces a notice.
/// - `block` is compared with `>=` and produces a denial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Optional warning threshold.
    pub warn: Option<f64>,
    /// Blocking threshold.
    pub block: f64,
}

/// Attributes of a dynamic requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSpec {
    /// Calculator producing the measured value.
    pub calculator: CalculatorKind,
    /// Comparison thresholds.
    pub thresholds: Thresholds,
    /// Calculation cache TTL in seconds.
    pub cache_ttl: u64,
    /// Base branch used by diff-based calculators.
    pub base_branch: String,
    /// Optional TTL applied to manual approvals (seconds).
    pub approval_ttl: Option<u64>,
}

/// Attributes of a guard requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSpec {
    /// Guard condition to evaluate.
    pub guard: GuardKind,
    /// Branches considered protected.
    pub protected_branches: Vec<String>,
    /// Staleness window for session activity (seconds).
    pub stale_after_seconds: u64,
    /// Optional TTL applied to manual approvals (seconds).
    pub approval_ttl: Option<u64>,
}

/// Type-specific attributes of a requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementKind {
    /// Manual satisfaction only.
    Blocking,
    /// Computed value compared against thresholds.
    Dynamic(DynamicSpec),
    /// Stateless boolean condition.
    Guard(GuardSpec),
}

impl RequirementKind {
    /// Returns the strategy selector for this kind.
    #[must_use]
    pub const fn requirement_type(&self) -> RequirementType {
        match self {
            Self::Blocking => RequirementType::Blocking,
            Self::Dynamic(_) => RequirementType::Dynamic,
            Self::Guard(_) => RequirementType::Guard,
        }
    }
}

// ============================================================================
// SECTION: Requirement Spec
// ============================================================================

/// Fully resolved requirement definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementSpec {
    /// Requirement name.
    pub name: RequirementName,
    /// Type-specific attributes.
    pub kind: RequirementKind,
    /// State lifetime bucket.
    pub scope: Scope,
    /// Whether the requirement is enforced.
    pub enabled: bool,
    /// Trigger predicate.
    pub trigger: TriggerPredicate,
    /// Denial message shown to the agent.
    pub message: Option<String>,
    /// Checklist items appended to the denial.
    pub checklist: Vec<String>,
    /// Skills whose completion satisfies the requirement.
    pub satisfied_by_skills: Vec<String>,
    /// Command patterns that clear single-use satisfaction.
    pub clear_on: Vec<CommandPattern>,
}

impl RequirementSpec {
    /// Creates an enabled blocking requirement with default trigger tools.
    #[must_use]
    pub fn blocking(name: impl Into<RequirementName>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            kind: RequirementKind::Blocking,
            scope,
            enabled: true,
            trigger: TriggerPredicate::default_tools(),
            message: None,
            checklist: Vec::new(),
            satisfied_by_skills: Vec::new(),
            clear_on: Vec::new(),
        }
    }

    /// Creates an enabled requirement of the given kind with default trigger tools.
    #[must_use]
    pub fn with_kind(name: impl Into<RequirementName>, kind: RequirementKind, scope: Scope) -> Self {
        Self {
            kind,
            ..Self::blocking(name, scope)
        }
    }

    /// Returns the strategy selector.
    #[must_use]
    pub const fn requirement_type(&self) -> RequirementType {
        self.kind.requirement_type()
    }

    /// Returns true when the requirement accepts session-scoped manual approval.
    #[must_use]
    pub const fn is_approvable(&self) -> bool {
        matches!(self.kind, RequirementKind::Dynamic(_) | RequirementKind::Guard(_))
    }
}

// ============================================================================
// SECTION: Action Requests
// ============================================================================

/// Attempted action supplied by the host on pre-action checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action kind (tool name).
    pub kind: String,
    /// Action target (file path or command text).
    pub target: Option<String>,
    /// Session performing the action.
    pub session: SessionId,
    /// Current branch.
    pub branch: BranchName,
    /// Project root directory.
    pub project: PathBuf,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test fixtures use explicit expects for clarity.")]

    use std::path::PathBuf;

    use super::ActionRequest;
    use super::CommandPattern;
    use super::GuardKind;
    use super::Scope;
    use super::TriggerPredicate;
    use super::TriggerRule;

    fn action(kind: &str, target: Option<&str>) -> ActionRequest {
        ActionRequest {
            kind: kind.to_string(),
            target: target.map(str::to_string),
            session: "s1".into(),
            branch: "feature/x".into(),
            project: PathBuf::from("/repo"),
        }
    }

    #[test]
    fn default_trigger_matches_edit_tools_only() {
        let trigger = TriggerPredicate::default_tools();
        assert!(trigger.matches(&action("Edit", Some("src/lib.rs"))));
        assert!(trigger.matches(&action("MultiEdit", None)));
        assert!(!trigger.matches(&action("Read", Some("src/lib.rs"))));
    }

    #[test]
    fn command_pattern_requires_matching_target() {
        let trigger = TriggerPredicate {
            rules: vec![TriggerRule {
                tool: "Bash".to_string(),
                command_pattern: Some(CommandPattern::new(r"gh\s+pr\s+create").expect("regex")),
            }],
        };
        assert!(trigger.matches(&action("Bash", Some("gh pr create --fill"))));
        assert!(!trigger.matches(&action("Bash", Some("ls"))));
        assert!(!trigger.matches(&action("Bash", None)));
    }

    #[test]
    fn scope_parses_both_single_use_spellings() {
        assert_eq!("single_use".parse::<Scope>(), Ok(Scope::SingleUse));
        assert_eq!("single-use".parse::<Scope>(), Ok(Scope::SingleUse));
        assert!("forever".parse::<Scope>().is_err());
    }

    #[test]
    fn unknown_guard_ids_are_preserved() {
        assert_eq!(GuardKind::from_id("lunar_phase"), GuardKind::Unknown("lunar_phase".to_string()));
        assert_eq!(GuardKind::from_id("protected_branch").as_str(), "protected_branch");
    }
}
