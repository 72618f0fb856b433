// crates/requirement-gate-cli/src/wiring.rs
// ============================================================================
// Module: Service Wiring
// Description: Assembles file-backed gate services for a working directory.
// Purpose: Connect git facts, layered configuration, and file stores.
// Dependencies: requirement-gate-{core,config,store-fs,providers}, thiserror
// ============================================================================

//! ## Overview
//! [`GateContext::open`] discovers the repository, resolves the layered
//! configuration, and builds [`GateServices`] over the file-backed stores:
//! branch documents under `<git-common-dir>/requirements/`, TTL caches under
//! the temp directory, and the session registry in the home directory.
//! Configuration warnings are reported through the configured event sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use requirement_gate_config::ConfigWarning;
use requirement_gate_config::LogDestination;
use requirement_gate_config::LoggingSettings;
use requirement_gate_config::ResolvedConfig;
use requirement_gate_config::resolve;
use requirement_gate_core::BranchName;
use requirement_gate_core::Clock;
use requirement_gate_core::EventLevel;
use requirement_gate_core::EventSink;
use requirement_gate_core::GateEvent;
use requirement_gate_core::GateServices;
use requirement_gate_core::RequirementSpec;
use requirement_gate_core::SessionContext;
use requirement_gate_core::SessionId;
use requirement_gate_core::SessionRegistry;
use requirement_gate_core::SystemClock;
use requirement_gate_core::runtime::CalculationCache;
use requirement_gate_core::runtime::DedupCache;
use requirement_gate_core::runtime::InMemorySessionRegistry;
use requirement_gate_core::telemetry::FileEventSink;
use requirement_gate_core::telemetry::LevelFilter;
use requirement_gate_core::telemetry::NoopEventSink;
use requirement_gate_core::telemetry::StderrEventSink;
use requirement_gate_providers::BuiltinCalculators;
use requirement_gate_providers::BuiltinGuards;
use requirement_gate_providers::GitFacts;
use requirement_gate_providers::VcsError;
use requirement_gate_store_fs::CALCULATION_CACHE_FILE;
use requirement_gate_store_fs::DEDUP_CACHE_FILE;
use requirement_gate_store_fs::FileSessionRegistry;
use requirement_gate_store_fs::FileTtlStore;
use requirement_gate_store_fs::FsBranchStateStore;
use requirement_gate_store_fs::default_cache_dir;
use requirement_gate_store_fs::default_registry_path;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable carrying the host session id for direct commands.
pub const SESSION_ENV_VAR: &str = "CLAUDE_SESSION_ID";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while assembling a gate context.
#[derive(Debug, Error)]
pub enum WiringError {
    /// Version control facts were unavailable.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

// ============================================================================
// SECTION: Storage Layout
// ============================================================================

/// File locations backing the gate services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Directory holding one document per branch.
    pub state_dir: PathBuf,
    /// Directory holding the dedup and calculation caches.
    pub cache_dir: PathBuf,
    /// Session registry file; in-memory when `None`.
    pub registry: Option<PathBuf>,
}

impl StorageLayout {
    /// Returns the default layout for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError`] when the git common directory cannot be resolved.
    pub fn for_repository(git: &GitFacts) -> Result<Self, VcsError> {
        Ok(Self {
            state_dir: git.state_dir()?,
            cache_dir: default_cache_dir(),
            registry: default_registry_path(),
        })
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the event sink described by the logging settings.
///
/// An unopenable log file falls back to stderr.
#[must_use]
pub fn build_sink(settings: &LoggingSettings) -> Arc<dyn EventSink> {
    match settings.destination {
        LogDestination::Disabled => Arc::new(NoopEventSink),
        LogDestination::Stderr => Arc::new(LevelFilter::new(settings.level, StderrEventSink)),
        LogDestination::File => match settings.file.as_deref().map(FileEventSink::new) {
            Some(Ok(sink)) => Arc::new(LevelFilter::new(settings.level, sink)),
            Some(Err(_)) | None => Arc::new(LevelFilter::new(settings.level, StderrEventSink)),
        },
    }
}

/// Builds file-backed services over `layout`.
#[must_use]
pub fn file_services(layout: &StorageLayout, sink: Arc<dyn EventSink>) -> GateServices {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sessions: Arc<dyn SessionRegistry> = match &layout.registry {
        Some(path) => Arc::new(FileSessionRegistry::new(path.clone())),
        None => Arc::new(InMemorySessionRegistry::new()),
    };
    GateServices {
        store: Arc::new(FsBranchStateStore::new(layout.state_dir.clone())),
        dedup: DedupCache::new(
            Arc::new(FileTtlStore::new(layout.cache_dir.join(DEDUP_CACHE_FILE))),
            Arc::clone(&clock),
            Arc::clone(&sink),
        ),
        calculations: CalculationCache::new(
            Arc::new(FileTtlStore::new(layout.cache_dir.join(CALCULATION_CACHE_FILE))),
            Arc::clone(&clock),
            Arc::clone(&sink),
        ),
        calculators: Arc::new(BuiltinCalculators::default()),
        guards: Arc::new(BuiltinGuards::default()),
        sessions,
        clock,
        sink,
    }
}

/// Records every configuration warning as an event.
pub fn report_warnings(services: &GateServices, warnings: &[ConfigWarning]) {
    for warning in warnings {
        services.emit(
            &GateEvent::new("config_warning", EventLevel::Warn, services.clock.now()).with_message(warning.to_string()),
        );
    }
}

/// Returns the most recently seen session on `project` and `branch`.
#[must_use]
pub fn latest_session(services: &GateServices, project: &Path, branch: &BranchName) -> Option<SessionId> {
    services
        .sessions
        .list()
        .ok()?
        .into_iter()
        .filter(|record| record.project == project && record.branch == *branch)
        .max_by_key(|record| record.last_seen)
        .map(|record| record.session)
}

// ============================================================================
// SECTION: Gate Context
// ============================================================================

/// Everything a command needs for one working directory.
pub struct GateContext {
    /// Repository facts.
    pub git: GitFacts,
    /// Current branch.
    pub branch: BranchName,
    /// Resolved configuration and provenance.
    pub resolved: ResolvedConfig,
    /// File-backed services.
    pub services: GateServices,
}

impl GateContext {
    /// Opens the context for the repository containing `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError`] when `dir` is not inside a repository with a
    /// checked-out branch.
    pub fn open(dir: &Path) -> Result<Self, WiringError> {
        let git = GitFacts::discover(dir)?;
        let branch = git.current_branch()?;
        let layout = StorageLayout::for_repository(&git)?;
        let resolved = resolve(git.root());
        let services = file_services(&layout, build_sink(resolved.config.logging()));
        report_warnings(&services, &resolved.warnings);
        Ok(Self {
            git,
            branch,
            resolved,
            services,
        })
    }

    /// Returns the effective requirement definitions.
    #[must_use]
    pub fn requirements(&self) -> &[RequirementSpec] {
        self.resolved.config.requirements()
    }

    /// Returns the operation target for `session` on the current branch.
    #[must_use]
    pub fn target(&self, session: SessionId) -> SessionContext {
        SessionContext {
            project: self.git.root().to_path_buf(),
            branch: self.branch.clone(),
            session,
        }
    }

    /// Resolves the session for a direct command.
    ///
    /// Precedence: explicit argument, [`SESSION_ENV_VAR`], then the most
    /// recently seen session on this project and branch.
    #[must_use]
    pub fn session(&self, explicit: Option<&str>) -> Option<SessionId> {
        explicit
            .map(str::to_string)
            .or_else(|| env::var(SESSION_ENV_VAR).ok())
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::new)
            .or_else(|| latest_session(&self.services, self.git.root(), &self.branch))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
