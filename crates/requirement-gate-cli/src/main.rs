// crates/requirement-gate-cli/src/main.rs
// ============================================================================
// Module: Requirement Gate CLI Entry Point
// Description: Command dispatcher for requirement commands and host hooks.
// Purpose: Provide the `req` binary over the file-backed gate services.
// Dependencies: clap, requirement-gate-{core,config,providers}, serde_json, thiserror, time.
// ============================================================================

//! ## Overview
//! `req` exposes the direct requirement operations (`satisfy`, `clear`,
//! `approve`, `status`) plus inspection and maintenance commands, and the
//! `hook` adapters the host calls around every tool invocation. Direct
//! commands surface user-actionable errors; `hook` never fails the host and
//! falls back to "no opinion" on any internal error.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::io::Read;
use std::io::Write;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use requirement_gate_cli::hooks::HookEvent;
use requirement_gate_cli::hooks::HookInput;
use requirement_gate_cli::hooks::MAX_HOOK_INPUT_BYTES;
use requirement_gate_cli::hooks::respond;
use requirement_gate_cli::t;
use requirement_gate_cli::wiring::GateContext;
use requirement_gate_cli::wiring::SESSION_ENV_VAR;
use requirement_gate_cli::wiring::build_sink;
use requirement_gate_config::LoggingSettings;
use requirement_gate_config::skip_requested;
use requirement_gate_core::Clock;
use requirement_gate_core::EventLevel;
use requirement_gate_core::EventSink;
use requirement_gate_core::GateEvent;
use requirement_gate_core::RequirementName;
use requirement_gate_core::SatisfactionMethod;
use requirement_gate_core::Scope;
use requirement_gate_core::SessionContext;
use requirement_gate_core::StatusReport;
use requirement_gate_core::SystemClock;
use requirement_gate_core::Timestamp;
use requirement_gate_core::runtime::SatisfyRequest;
use requirement_gate_core::runtime::operations;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "req", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Session id for session-scoped commands.
    #[arg(long, value_name = "ID", global = true)]
    session: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List the effective requirement definitions.
    List,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show requirement state for the current branch and session.
    Status(StatusCommand),
    /// Satisfy one or more requirements.
    Satisfy(SatisfyCommand),
    /// Clear a requirement, or every requirement with `--all`.
    Clear(ClearCommand),
    /// Approve a dynamic or guard requirement for this session.
    Approve(ApproveCommand),
    /// Remove state of deleted branches and sweep expired entries.
    Prune,
    /// List recently active sessions.
    Sessions,
    /// Host hook adapter reading JSON on stdin.
    Hook(HookCommand),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration, its sources, and warnings as JSON.
    Show,
}

/// Arguments for `status`.
#[derive(Args, Debug)]
struct StatusCommand {
    /// Emit the report as JSON.
    #[arg(long)]
    json: bool,
}

/// Arguments for `satisfy`.
#[derive(Args, Debug)]
struct SatisfyCommand {
    /// Requirement names.
    #[arg(required = true, value_name = "NAME")]
    names: Vec<String>,
    /// Scope override for blocking requirements.
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,
    /// Time-to-live in seconds.
    #[arg(long, value_name = "SECONDS")]
    ttl: Option<u64>,
    /// Metadata entries recorded with the satisfaction.
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,
}

/// Arguments for `clear`.
#[derive(Args, Debug)]
struct ClearCommand {
    /// Requirement name.
    #[arg(value_name = "NAME", required_unless_present = "all", conflicts_with = "all")]
    name: Option<String>,
    /// Scope to clear (defaults to the configured scope).
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,
    /// Clear every configured requirement.
    #[arg(long)]
    all: bool,
}

/// Arguments for `approve`.
#[derive(Args, Debug)]
struct ApproveCommand {
    /// Requirement name.
    #[arg(value_name = "NAME")]
    name: String,
    /// Approval time-to-live in seconds.
    #[arg(long, value_name = "SECONDS")]
    ttl: Option<u64>,
}

/// Arguments for `hook`.
#[derive(Args, Debug)]
struct HookCommand {
    /// Host lifecycle event.
    #[arg(value_enum)]
    event: HookEventArg,
}

/// Scope labels accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeArg {
    /// Current session only.
    Session,
    /// Every session on the branch.
    Branch,
    /// Every session on the branch, never cleared by lifecycle events.
    Permanent,
    /// Current session until a clearing command runs.
    SingleUse,
}

/// Hook events accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum HookEventArg {
    /// Session started.
    SessionStart,
    /// Tool about to run.
    PreToolUse,
    /// Tool finished.
    PostToolUse,
    /// Agent about to stop.
    Stop,
    /// Session ended.
    SessionEnd,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a rendered message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    };

    let session = cli.session.as_deref();
    match command {
        Commands::List => command_list(),
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Status(command) => command_status(&command, session),
        Commands::Satisfy(command) => command_satisfy(&command, session),
        Commands::Clear(command) => command_clear(&command, session),
        Commands::Approve(command) => command_approve(&command, session),
        Commands::Prune => command_prune(),
        Commands::Sessions => command_sessions(),
        Commands::Hook(command) => Ok(command_hook(hook_event_from_arg(command.event))),
    }
}

// ============================================================================
// SECTION: Context Helpers
// ============================================================================

/// Opens the gate context for the current working directory.
fn open_context() -> CliResult<GateContext> {
    let cwd = env::current_dir().map_err(|err| CliError::new(t!("context.cwd_failed", error = err)))?;
    GateContext::open(&cwd).map_err(|err| CliError::new(t!("context.open_failed", error = err)))
}

/// Resolves the operation target, requiring a session.
fn session_target(ctx: &GateContext, explicit: Option<&str>) -> CliResult<SessionContext> {
    let session =
        ctx.session(explicit).ok_or_else(|| CliError::new(t!("context.no_session", env = SESSION_ENV_VAR)))?;
    Ok(ctx.target(session))
}

/// Maps a command-line scope onto the engine scope.
const fn scope_from_arg(scope: ScopeArg) -> Scope {
    match scope {
        ScopeArg::Session => Scope::Session,
        ScopeArg::Branch => Scope::Branch,
        ScopeArg::Permanent => Scope::Permanent,
        ScopeArg::SingleUse => Scope::SingleUse,
    }
}

/// Maps a command-line hook event onto the adapter event.
const fn hook_event_from_arg(event: HookEventArg) -> HookEvent {
    match event {
        HookEventArg::SessionStart => HookEvent::SessionStart,
        HookEventArg::PreToolUse => HookEvent::PreToolUse,
        HookEventArg::PostToolUse => HookEvent::PostToolUse,
        HookEventArg::Stop => HookEvent::Stop,
        HookEventArg::SessionEnd => HookEvent::SessionEnd,
    }
}

/// Parses `key=value` metadata entries into a JSON map.
fn parse_metadata(entries: &[String]) -> CliResult<Option<Map<String, Value>>> {
    if entries.is_empty() {
        return Ok(None);
    }
    let mut metadata = Map::new();
    for entry in entries {
        let Some((key, value)) = entry.split_once('=').filter(|(key, _)| !key.trim().is_empty()) else {
            return Err(CliError::new(t!("input.meta_invalid", entry = entry)));
        };
        metadata.insert(key.trim().to_string(), Value::String(value.to_string()));
    }
    Ok(Some(metadata))
}

/// Renders a timestamp as RFC 3339 in UTC.
fn format_timestamp(timestamp: Timestamp) -> String {
    let nanos = i128::from(timestamp.as_unix_millis()) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|moment| moment.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp.as_unix_millis().to_string())
}

// ============================================================================
// SECTION: Inspection Commands
// ============================================================================

/// Executes the `list` command.
fn command_list() -> CliResult<ExitCode> {
    let ctx = open_context()?;
    if !ctx.resolved.config.is_globally_enabled() {
        write_line(&t!("list.globally_disabled"))?;
    }
    if ctx.requirements().is_empty() {
        write_line(&t!("list.empty"))?;
        return Ok(ExitCode::SUCCESS);
    }
    for spec in ctx.requirements() {
        let state = if spec.enabled { t!("list.enabled") } else { t!("list.disabled") };
        write_line(&t!(
            "list.entry",
            name = spec.name,
            kind = spec.requirement_type(),
            scope = spec.scope,
            state = state
        ))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `config` subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Show => {
            let ctx = open_context()?;
            let sources = &ctx.resolved.sources;
            let document = json!({
                "effective": ctx.resolved.config.layer(),
                "requirements": ctx.requirements().iter().map(|spec| spec.name.as_str()).collect::<Vec<_>>(),
                "sources": {
                    "global": sources.global,
                    "project": sources.project,
                    "local": sources.local,
                },
                "warnings": ctx.resolved.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            write_json(&document)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the `status` command.
fn command_status(command: &StatusCommand, session: Option<&str>) -> CliResult<ExitCode> {
    let ctx = open_context()?;
    let target = session_target(&ctx, session)?;
    let report = operations::status(&ctx.services, ctx.requirements(), &target);
    if command.json {
        write_json(&report)?;
    } else {
        for line in render_status(&report) {
            write_line(&line)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders a status report as text lines.
fn render_status(report: &StatusReport) -> Vec<String> {
    let mut lines = vec![t!("status.header", branch = report.branch, session = report.session)];
    if report.requirements.is_empty() {
        lines.push(t!("status.empty"));
        return lines;
    }
    for entry in &report.requirements {
        let line = if !entry.enabled {
            t!("status.disabled", name = entry.name, kind = entry.requirement_type, scope = entry.scope)
        } else if entry.satisfied {
            let at = entry.satisfied_at.map(format_timestamp).unwrap_or_default();
            let method = entry.method.map(SatisfactionMethod::as_str).unwrap_or_default();
            let expiry =
                entry.expires_at.map(|at| t!("status.expires", at = format_timestamp(at))).unwrap_or_default();
            t!(
                "status.satisfied",
                name = entry.name,
                kind = entry.requirement_type,
                scope = entry.scope,
                at = at,
                method = method,
                expiry = expiry
            )
        } else {
            let triggered = if entry.triggered { t!("status.triggered") } else { String::new() };
            t!(
                "status.unsatisfied",
                name = entry.name,
                kind = entry.requirement_type,
                scope = entry.scope,
                triggered = triggered
            )
        };
        lines.push(line);
    }
    lines
}

/// Executes the `sessions` command.
fn command_sessions() -> CliResult<ExitCode> {
    let ctx = open_context()?;
    let mut records = ctx.services.sessions.list().map_err(|err| CliError::new(err.to_string()))?;
    if records.is_empty() {
        write_line(&t!("sessions.empty"))?;
        return Ok(ExitCode::SUCCESS);
    }
    records.sort_by(|left, right| right.last_seen.cmp(&left.last_seen));
    for record in records {
        write_line(&t!(
            "sessions.entry",
            session = record.session,
            branch = record.branch,
            project = record.project.display(),
            at = format_timestamp(record.last_seen)
        ))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: State Commands
// ============================================================================

/// Executes the `satisfy` command.
fn command_satisfy(command: &SatisfyCommand, session: Option<&str>) -> CliResult<ExitCode> {
    let metadata = parse_metadata(&command.meta)?;
    let ctx = open_context()?;
    let target = session_target(&ctx, session)?;
    let names = command.names.iter().map(|name| RequirementName::new(name.as_str())).collect::<Vec<_>>();
    let request = SatisfyRequest {
        scope: command.scope.map(scope_from_arg),
        metadata,
        ttl: command.ttl,
    };
    let outcomes = operations::satisfy(&ctx.services, ctx.requirements(), &target, &names, &request)
        .map_err(|err| CliError::new(err.to_string()))?;
    for outcome in outcomes {
        let line = if outcome.approved {
            t!("satisfy.approved", name = outcome.name)
        } else {
            t!("satisfy.ok", name = outcome.name, scope = outcome.scope)
        };
        write_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `clear` command.
fn command_clear(command: &ClearCommand, session: Option<&str>) -> CliResult<ExitCode> {
    let ctx = open_context()?;
    let target = session_target(&ctx, session)?;
    match command.name.as_deref() {
        Some(name) => {
            let name = RequirementName::new(name);
            let scope = operations::clear(
                &ctx.services,
                ctx.requirements(),
                &target,
                &name,
                command.scope.map(scope_from_arg),
            )
            .map_err(|err| CliError::new(err.to_string()))?;
            write_line(&t!("clear.ok", name = name, scope = scope))?;
        }
        None => {
            let count = operations::clear_all(&ctx.services, ctx.requirements(), &target);
            write_line(&t!("clear.all", count = count))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `approve` command.
fn command_approve(command: &ApproveCommand, session: Option<&str>) -> CliResult<ExitCode> {
    let ctx = open_context()?;
    let target = session_target(&ctx, session)?;
    let name = RequirementName::new(command.name.as_str());
    operations::approve(&ctx.services, ctx.requirements(), &target, &name, command.ttl)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_line(&t!("approve.ok", name = name))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `prune` command.
fn command_prune() -> CliResult<ExitCode> {
    let ctx = open_context()?;
    let existing = ctx.git.branches().map_err(|err| CliError::new(t!("context.open_failed", error = err)))?;
    let report = operations::prune(&ctx.services, &existing).map_err(|err| CliError::new(err.to_string()))?;
    for branch in &report.removed_branches {
        write_line(&t!("prune.removed", branch = branch))?;
    }
    write_line(&t!("prune.summary", removed = report.removed_branches.len(), swept = report.swept_entries))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Hook Command
// ============================================================================

/// Executes the `hook` command. Always succeeds.
///
/// With the kill switch set the hook reads nothing and answers nothing.
fn command_hook(event: HookEvent) -> ExitCode {
    if skip_requested() {
        return ExitCode::SUCCESS;
    }
    match run_hook(event) {
        Ok(Some(response)) => {
            let _ = write_stdout_line(&response.to_string());
        }
        Ok(None) => {}
        Err(err) => {
            build_sink(&LoggingSettings::default()).record(
                &GateEvent::new("hook_failed", EventLevel::Error, SystemClock.now())
                    .with_message(err.to_string())
                    .with_detail(json!({ "hook": event.as_str(), "decision": "allow" })),
            );
        }
    }
    ExitCode::SUCCESS
}

/// Reads the hook payload, opens the context, and dispatches the event.
fn run_hook(event: HookEvent) -> CliResult<Option<Value>> {
    let bytes = read_stdin_with_limit(MAX_HOOK_INPUT_BYTES)?;
    let input = HookInput::parse(&bytes).map_err(|err| CliError::new(t!("input.stdin_failed", error = err)))?;
    let dir = match &input.cwd {
        Some(dir) => dir.clone(),
        None => env::current_dir().map_err(|err| CliError::new(t!("context.cwd_failed", error = err)))?,
    };
    let ctx = GateContext::open(&dir).map_err(|err| CliError::new(t!("context.open_failed", error = err)))?;
    let target = ctx.target(input.session());
    Ok(respond(event, &input, &ctx.services, &ctx.resolved.config, &target))
}

/// Reads stdin while enforcing a hard size limit.
fn read_stdin_with_limit(max_bytes: usize) -> CliResult<Vec<u8>> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut bytes = Vec::new();
    std::io::stdin()
        .lock()
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::new(t!("input.stdin_failed", error = err)))?;
    if bytes.len() > max_bytes {
        return Err(CliError::new(t!("input.stdin_too_large", limit = max_bytes)));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stdout, mapping failures to [`CliError`].
fn write_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a value as pretty JSON to stdout.
fn write_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    write_line(&rendered)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
