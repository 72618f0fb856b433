// crates/requirement-gate-cli/src/messages.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for CLI output.
// Purpose: Keep every user-facing string of `req` in one table.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! User-facing strings live in [`CATALOG`] and are rendered through the
//! [`t!`](crate::t) macro, which substitutes `{name}` placeholders.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys render as the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// The placeholder name used in message templates.
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English message catalog.
pub const CATALOG: &[(&str, &str)] = &[
    ("main.version", "req {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to render JSON output: {error}"),
    ("context.cwd_failed", "Unable to determine the working directory: {error}"),
    ("context.open_failed", "Requirement Gate is unavailable here: {error}"),
    ("context.no_session", "No active session found for this branch; pass --session or set {env}."),
    ("input.meta_invalid", "Invalid metadata entry '{entry}'; expected key=value."),
    ("input.stdin_failed", "Failed to read hook input: {error}"),
    ("input.stdin_too_large", "Hook input exceeds {limit} bytes."),
    ("list.empty", "No requirements configured."),
    ("list.entry", "{name}  {kind}  {scope}  {state}"),
    ("list.enabled", "enabled"),
    ("list.disabled", "disabled"),
    ("list.globally_disabled", "Requirement Gate is disabled by configuration."),
    ("config.warning", "warning: {warning}"),
    ("status.header", "Requirements on {branch} (session {session}):"),
    ("status.empty", "No requirements configured."),
    ("status.satisfied", "  [x] {name} ({kind}, {scope}) satisfied {at} via {method}{expiry}"),
    ("status.unsatisfied", "  [ ] {name} ({kind}, {scope}){triggered}"),
    ("status.disabled", "  [-] {name} ({kind}, {scope}) disabled"),
    ("status.expires", ", expires {at}"),
    ("status.triggered", " triggered"),
    ("satisfy.ok", "Satisfied {name} ({scope})."),
    ("satisfy.approved", "Approved {name} for this session."),
    ("clear.ok", "Cleared {name} ({scope})."),
    ("clear.all", "Cleared {count} requirement(s)."),
    ("approve.ok", "Approved {name} for this session."),
    ("prune.removed", "  removed {branch}"),
    ("prune.summary", "Removed {removed} branch document(s); swept {swept} expired entries."),
    ("sessions.empty", "No sessions recorded."),
    ("sessions.entry", "{session}  {branch}  {project}  last seen {at}"),
    ("hook.session_start", "Requirement Gate: {count} requirement(s) unsatisfied on {branch}: {names}."),
    ("hook.stop", "Requirements still unsatisfied: {names}. Run `{command}` before finishing."),
];

/// Returns the catalog as a lookup map.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Renders `key` while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::messages::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::messages::translate($key, args)
    }};
}
