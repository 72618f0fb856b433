// crates/requirement-gate-cli/src/hooks.rs
// ============================================================================
// Module: Host Hook Adapters
// Description: Translates host lifecycle payloads into gate operations.
// Purpose: Bridge the JSON hook protocol to the lifecycle boundary.
// Dependencies: requirement-gate-core, requirement-gate-config, serde, serde_json
// ============================================================================

//! ## Overview
//! The host invokes `req hook <event>` with a JSON payload on stdin and reads
//! an optional JSON response from stdout. [`respond`] maps each
//! [`HookEvent`] onto the matching lifecycle call:
//!
//! - `session-start`: registers the session and summarizes pending requirements.
//! - `pre-tool-use`: runs the checker; a denial becomes a `deny` permission decision.
//! - `post-tool-use`: auto-satisfies skill-mapped requirements and clears
//!   single-use requirements after matching commands.
//! - `stop`: blocks termination while triggered blocking requirements remain
//!   unsatisfied, unless the host reports the stop hook already fired.
//! - `session-end`: removes the session's entries.
//!
//! A `None` response means "no opinion"; the host proceeds normally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use requirement_gate_config::EffectiveConfig;
use requirement_gate_core::ActionRequest;
use requirement_gate_core::CheckDecision;
use requirement_gate_core::CompletedAction;
use requirement_gate_core::EventLevel;
use requirement_gate_core::GateEvent;
use requirement_gate_core::GateServices;
use requirement_gate_core::RequirementChecker;
use requirement_gate_core::SessionContext;
use requirement_gate_core::SessionId;
use requirement_gate_core::runtime::post_action;
use requirement_gate_core::runtime::session_end;
use requirement_gate_core::runtime::session_start;
use requirement_gate_core::runtime::session_stop;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::t;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted hook payload size in bytes.
pub const MAX_HOOK_INPUT_BYTES: usize = 1024 * 1024;

/// Tool input keys consulted for the action target, in order.
const TARGET_KEYS: &[&str] = &["command", "file_path", "notebook_path", "path"];

/// Tool reporting a completed skill.
const SKILL_TOOL: &str = "Skill";

/// Tool running shell commands.
const SHELL_TOOL: &str = "Bash";

// ============================================================================
// SECTION: Events
// ============================================================================

/// Host lifecycle events handled by `req hook`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// A session started.
    SessionStart,
    /// A tool is about to run.
    PreToolUse,
    /// A tool finished.
    PostToolUse,
    /// The agent is about to stop.
    Stop,
    /// A session ended.
    SessionEnd,
}

impl HookEvent {
    /// Returns the command-line label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "session-start",
            Self::PreToolUse => "pre-tool-use",
            Self::PostToolUse => "post-tool-use",
            Self::Stop => "stop",
            Self::SessionEnd => "session-end",
        }
    }

    /// Returns the event name used in host responses.
    #[must_use]
    pub const fn host_name(self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Stop => "Stop",
            Self::SessionEnd => "SessionEnd",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "session-start" => Ok(Self::SessionStart),
            "pre-tool-use" => Ok(Self::PreToolUse),
            "post-tool-use" => Ok(Self::PostToolUse),
            "stop" => Ok(Self::Stop),
            "session-end" => Ok(Self::SessionEnd),
            other => Err(format!("unknown hook event: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Input
// ============================================================================

/// Hook payload supplied by the host on stdin.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookInput {
    /// Host session id.
    #[serde(default)]
    pub session_id: String,
    /// Working directory of the session.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Tool being run or just completed.
    #[serde(default)]
    pub tool_name: Option<String>,
    /// Raw tool arguments.
    #[serde(default)]
    pub tool_input: Value,
    /// Set when the host is already continuing because of a stop hook.
    #[serde(default)]
    pub stop_hook_active: bool,
}

impl HookInput {
    /// Parses a hook payload.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the payload is not a JSON object.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns the session id, trimmed.
    #[must_use]
    pub fn session(&self) -> SessionId {
        SessionId::new(self.session_id.trim())
    }

    /// Returns the action target: the command for shell tools, otherwise a path.
    #[must_use]
    pub fn action_target(&self) -> Option<String> {
        TARGET_KEYS.iter().find_map(|key| self.tool_input_str(key)).map(str::to_string)
    }

    /// Describes the completed tool for post-action processing.
    #[must_use]
    pub fn completed_action(&self) -> Option<CompletedAction> {
        let tool = self.tool_name.as_deref()?;
        let action = match tool {
            SKILL_TOOL => CompletedAction::Skill {
                name: self.tool_input_str("skill").or_else(|| self.tool_input_str("name"))?.to_string(),
            },
            SHELL_TOOL => CompletedAction::Command {
                text: self.tool_input_str("command")?.to_string(),
            },
            other => CompletedAction::Tool {
                kind: other.to_string(),
            },
        };
        Some(action)
    }

    /// Returns a string field of the tool input.
    fn tool_input_str(&self, key: &str) -> Option<&str> {
        self.tool_input.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Handles one hook event and returns the JSON response, if any.
///
/// A blank session id carries no isolation, so the event is logged and
/// answered with no opinion without touching state.
#[must_use]
pub fn respond(
    event: HookEvent,
    input: &HookInput,
    services: &GateServices,
    config: &EffectiveConfig,
    target: &SessionContext,
) -> Option<Value> {
    if target.session.as_str().trim().is_empty() {
        services.emit(
            &GateEvent::new("hook_skipped", EventLevel::Warn, services.clock.now())
                .with_branch(&target.branch)
                .with_message("hook payload has no session id")
                .with_detail(json!({ "hook": event.as_str(), "decision": "allow" })),
        );
        return None;
    }
    match event {
        HookEvent::SessionStart => on_session_start(services, config, target),
        HookEvent::PreToolUse => on_pre_tool_use(input, services, config, target),
        HookEvent::PostToolUse => {
            on_post_tool_use(input, services, config, target);
            None
        }
        HookEvent::Stop => on_stop(input, services, config, target),
        HookEvent::SessionEnd => {
            session_end(services, target);
            None
        }
    }
}

/// Registers the session and lists pending requirements as context.
fn on_session_start(services: &GateServices, config: &EffectiveConfig, target: &SessionContext) -> Option<Value> {
    let report = session_start(services, config.requirements(), target);
    if !config.is_globally_enabled() {
        return None;
    }
    let pending = report.unsatisfied();
    if pending.is_empty() {
        return None;
    }
    let names = pending.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>().join(", ");
    let context = t!("hook.session_start", count = pending.len(), branch = target.branch, names = names);
    Some(json!({
        "hookSpecificOutput": {
            "hookEventName": HookEvent::SessionStart.host_name(),
            "additionalContext": context,
        }
    }))
}

/// Runs the pre-action check.
fn on_pre_tool_use(
    input: &HookInput,
    services: &GateServices,
    config: &EffectiveConfig,
    target: &SessionContext,
) -> Option<Value> {
    let action = ActionRequest {
        kind: input.tool_name.clone().unwrap_or_default(),
        target: input.action_target(),
        session: target.session.clone(),
        branch: target.branch.clone(),
        project: target.project.clone(),
    };
    let checker = RequirementChecker::new(services, config.requirements(), config.check_settings());
    match checker.check(&action) {
        CheckDecision::Allow {
            notices,
        } => {
            if notices.is_empty() {
                return None;
            }
            Some(json!({
                "hookSpecificOutput": {
                    "hookEventName": HookEvent::PreToolUse.host_name(),
                    "additionalContext": notices.join("\n\n"),
                }
            }))
        }
        CheckDecision::Deny {
            message,
            notices,
            ..
        } => {
            let mut reason = message;
            for notice in notices {
                reason.push_str("\n\n");
                reason.push_str(&notice);
            }
            Some(json!({
                "hookSpecificOutput": {
                    "hookEventName": HookEvent::PreToolUse.host_name(),
                    "permissionDecision": "deny",
                    "permissionDecisionReason": reason,
                }
            }))
        }
    }
}

/// Applies post-action effects of the completed tool.
fn on_post_tool_use(input: &HookInput, services: &GateServices, config: &EffectiveConfig, target: &SessionContext) {
    if !config.is_globally_enabled() {
        return;
    }
    let Some(action) = input.completed_action() else {
        return;
    };
    let report = post_action(services, config.requirements(), target, &action);
    if report.satisfied.is_empty() && report.cleared.is_empty() {
        return;
    }
    services.emit(
        &GateEvent::new("post_action_applied", EventLevel::Info, services.clock.now())
            .with_branch(&target.branch)
            .with_session(&target.session)
            .with_detail(json!({ "satisfied": report.satisfied, "cleared": report.cleared })),
    );
}

/// Blocks termination while triggered requirements remain unsatisfied.
fn on_stop(
    input: &HookInput,
    services: &GateServices,
    config: &EffectiveConfig,
    target: &SessionContext,
) -> Option<Value> {
    let stop = config.stop_hook();
    if input.stop_hook_active || !stop.verify_requirements || !config.is_globally_enabled() {
        return None;
    }
    let pending = session_stop(services, config.requirements(), target, &stop.verify_scopes);
    if pending.is_empty() {
        return None;
    }
    let names = pending.iter().map(|item| item.name.as_str()).collect::<Vec<_>>();
    let command = format!("req satisfy {}", names.join(" "));
    Some(json!({
        "decision": "block",
        "reason": t!("hook.stop", names = names.join(", "), command = command),
    }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test fixtures use explicit expects for clarity.")]

    use requirement_gate_core::CompletedAction;
    use serde_json::json;

    use super::HookEvent;
    use super::HookInput;

    fn input(tool: &str, tool_input: serde_json::Value) -> HookInput {
        HookInput {
            session_id: "s1".to_string(),
            tool_name: Some(tool.to_string()),
            tool_input,
            ..HookInput::default()
        }
    }

    #[test]
    fn target_prefers_command_then_path() {
        assert_eq!(input("Bash", json!({ "command": "git status" })).action_target().as_deref(), Some("git status"));
        assert_eq!(input("Edit", json!({ "file_path": "src/lib.rs" })).action_target().as_deref(), Some("src/lib.rs"));
        assert_eq!(input("Task", json!({ "prompt": "x" })).action_target(), None);
    }

    #[test]
    fn completed_actions_follow_tool_kind() {
        assert_eq!(
            input("Skill", json!({ "skill": "commit-plan" })).completed_action(),
            Some(CompletedAction::Skill {
                name: "commit-plan".to_string(),
            })
        );
        assert_eq!(
            input("Bash", json!({ "command": "git commit -m x" })).completed_action(),
            Some(CompletedAction::Command {
                text: "git commit -m x".to_string(),
            })
        );
        assert_eq!(
            input("Write", json!({})).completed_action(),
            Some(CompletedAction::Tool {
                kind: "Write".to_string(),
            })
        );
        assert_eq!(input("Bash", json!({})).completed_action(), None);
    }

    #[test]
    fn hook_event_labels_round_trip() {
        for event in
            [HookEvent::SessionStart, HookEvent::PreToolUse, HookEvent::PostToolUse, HookEvent::Stop, HookEvent::SessionEnd]
        {
            assert_eq!(event.as_str().parse::<HookEvent>(), Ok(event));
        }
        assert!("teardown".parse::<HookEvent>().is_err());
    }

    #[test]
    fn session_id_is_trimmed() {
        let parsed = HookInput::parse(br#"{"session_id":"  abc \n"}"#).expect("payload");
        assert_eq!(parsed.session().as_str(), "abc");
        assert!(HookInput::parse(b"{}").expect("payload").session().as_str().is_empty());
    }

    #[test]
    fn unknown_payload_fields_are_ignored() {
        let parsed = HookInput::parse(br#"{"session_id":"abc","transcript_path":"/tmp/t","stop_hook_active":true}"#);
        assert!(parsed.is_ok_and(|input| input.session_id == "abc" && input.stop_hook_active));
    }
}
