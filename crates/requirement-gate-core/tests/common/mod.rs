// crates/requirement-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Harness
// Description: Shared fixtures for requirement gate integration tests.
// Purpose: Assemble in-memory services with a manual clock and fixed evaluators.
// Dependencies: requirement-gate-core
// ============================================================================

//! ## Overview
//! Builds [`GateServices`] over in-memory stores, a manual clock, a fixed-value
//! calculator, and a protected-branch guard so tests can drive every strategy
//! deterministically.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers.")]
#![allow(clippy::unwrap_used, reason = "Fixture locks are never poisoned in tests.")]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use requirement_gate_core::ActionRequest;
use requirement_gate_core::BranchName;
use requirement_gate_core::CalculatedValue;
use requirement_gate_core::CalculationContext;
use requirement_gate_core::Calculator;
use requirement_gate_core::CalculatorCatalog;
use requirement_gate_core::CalculatorError;
use requirement_gate_core::CalculatorKind;
use requirement_gate_core::CheckSettings;
use requirement_gate_core::DynamicSpec;
use requirement_gate_core::GateServices;
use requirement_gate_core::GuardCatalog;
use requirement_gate_core::GuardCondition;
use requirement_gate_core::GuardContext;
use requirement_gate_core::GuardKind;
use requirement_gate_core::GuardSpec;
use requirement_gate_core::ManualClock;
use requirement_gate_core::RequirementKind;
use requirement_gate_core::RequirementSpec;
use requirement_gate_core::Scope;
use requirement_gate_core::SessionContext;
use requirement_gate_core::Thresholds;
use requirement_gate_core::Timestamp;
use requirement_gate_core::runtime::CalculationCache;
use requirement_gate_core::runtime::DedupCache;
use requirement_gate_core::runtime::InMemoryBranchStateStore;
use requirement_gate_core::runtime::InMemorySessionRegistry;
use requirement_gate_core::runtime::InMemoryTtlStore;
use requirement_gate_core::telemetry::MemoryEventSink;

/// Project root used by every fixture.
pub const PROJECT: &str = "/work/project";

/// Calculator returning a settable value and counting calls.
#[derive(Default)]
pub struct FixedCalculator {
    /// Value returned by the next computation.
    pub value: Mutex<f64>,
    /// Number of computations.
    pub calls: AtomicUsize,
    /// Error returned instead of a value when set.
    pub failure: Mutex<Option<String>>,
}

impl Calculator for FixedCalculator {
    fn compute(&self, _ctx: &CalculationContext<'_>) -> Result<CalculatedValue, CalculatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(CalculatorError::Vcs(reason));
        }
        Ok(CalculatedValue {
            value: *self.value.lock().unwrap(),
            detail: Some("fixture".to_string()),
        })
    }
}

/// Catalog exposing only the fixed calculator as `branch_size`.
#[derive(Default)]
pub struct TestCalculators {
    /// Branch size stand-in.
    pub branch_size: FixedCalculator,
}

impl CalculatorCatalog for TestCalculators {
    fn calculator(&self, kind: &CalculatorKind) -> Option<&dyn Calculator> {
        match kind {
            CalculatorKind::BranchSize => Some(&self.branch_size),
            CalculatorKind::Unknown(_) => None,
        }
    }
}

/// Guard denying actions on configured protected branches.
pub struct ProtectedBranchCondition;

impl GuardCondition for ProtectedBranchCondition {
    fn evaluate(&self, ctx: &GuardContext<'_>) -> bool {
        !ctx.spec.protected_branches.iter().any(|branch| branch == ctx.branch.as_str())
    }

    fn denial_reason(&self, ctx: &GuardContext<'_>) -> String {
        format!("branch {} is protected", ctx.branch)
    }
}

/// Catalog exposing only the protected-branch guard.
pub struct TestGuards {
    /// Protected-branch condition.
    pub protected: ProtectedBranchCondition,
}

impl GuardCatalog for TestGuards {
    fn guard(&self, kind: &GuardKind) -> Option<&dyn GuardCondition> {
        match kind {
            GuardKind::ProtectedBranch => Some(&self.protected),
            _ => None,
        }
    }
}

/// Fully wired in-memory services.
pub struct Harness {
    /// Services under test.
    pub services: GateServices,
    /// Manual clock shared by every component.
    pub clock: Arc<ManualClock>,
    /// Branch store, for write counting.
    pub store: InMemoryBranchStateStore,
    /// Recorded events.
    pub sink: Arc<MemoryEventSink>,
    /// Calculator catalog, for adjusting values.
    pub calculators: Arc<TestCalculators>,
}

impl Harness {
    /// Builds a harness at t = 1_700_000_000 s.
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(1_700_000_000_000)));
        let sink = Arc::new(MemoryEventSink::new());
        let store = InMemoryBranchStateStore::new();
        let calculators = Arc::new(TestCalculators::default());
        let services = GateServices {
            store: Arc::new(store.clone()),
            dedup: DedupCache::new(Arc::new(InMemoryTtlStore::new()), clock.clone(), sink.clone()),
            calculations: CalculationCache::new(Arc::new(InMemoryTtlStore::new()), clock.clone(), sink.clone()),
            calculators: calculators.clone(),
            guards: Arc::new(TestGuards {
                protected: ProtectedBranchCondition,
            }),
            sessions: Arc::new(InMemorySessionRegistry::new()),
            clock: clock.clone(),
            sink: sink.clone(),
        };
        Self {
            services,
            clock,
            store,
            sink,
            calculators,
        }
    }

    /// Sets the value the branch size calculator returns.
    pub fn set_branch_size(&self, value: f64) {
        *self.calculators.branch_size.value.lock().unwrap() = value;
    }

    /// Makes the branch size calculator fail with `reason`.
    pub fn fail_branch_size(&self, reason: &str) {
        *self.calculators.branch_size.failure.lock().unwrap() = Some(reason.to_string());
    }
}

/// Returns default checker settings.
pub fn settings() -> CheckSettings {
    CheckSettings::default()
}

/// Builds a session context.
pub fn target(branch: &str, session: &str) -> SessionContext {
    SessionContext {
        project: PathBuf::from(PROJECT),
        branch: BranchName::new(branch),
        session: session.into(),
    }
}

/// Builds an edit action on `src/lib.rs`.
pub fn edit(branch: &str, session: &str) -> ActionRequest {
    ActionRequest {
        kind: "Edit".to_string(),
        target: Some("src/lib.rs".to_string()),
        session: session.into(),
        branch: BranchName::new(branch),
        project: PathBuf::from(PROJECT),
    }
}

/// Builds a blocking requirement.
pub fn blocking(name: &str, scope: Scope) -> RequirementSpec {
    RequirementSpec {
        message: Some(format!("Complete {name} first.")),
        ..RequirementSpec::blocking(name, scope)
    }
}

/// Builds the branch size dynamic requirement with warn 250 and block 400.
pub fn branch_size_limit() -> RequirementSpec {
    RequirementSpec::with_kind(
        "branch_size_limit",
        RequirementKind::Dynamic(DynamicSpec {
            calculator: CalculatorKind::BranchSize,
            thresholds: Thresholds {
                warn: Some(250.0),
                block: 400.0,
            },
            cache_ttl: 30,
            base_branch: "main".to_string(),
            approval_ttl: None,
        }),
        Scope::Session,
    )
}

/// Builds a guard requirement of the given kind protecting main and master.
pub fn guard(name: &str, kind: GuardKind) -> RequirementSpec {
    RequirementSpec::with_kind(
        name,
        RequirementKind::Guard(GuardSpec {
            guard: kind,
            protected_branches: vec!["main".to_string(), "master".to_string()],
            stale_after_seconds: 7_200,
            approval_ttl: None,
        }),
        Scope::Session,
    )
}
