// crates/requirement-gate-providers/src/guards.rs
// ============================================================================
// Module: Built-in Guard Conditions
// Description: Stateless conditions backing guard requirements.
// Purpose: Block edits on protected branches and concurrent sessions.
// Dependencies: requirement-gate-core
// ============================================================================

//! ## Overview
//! Guards are pure reads over the [`GuardContext`]. The single-session guard
//! consults the session registry; if the registry cannot be read it allows
//! the action.

// ============================================================================
// SECTION: Imports
// ============================================================================

use requirement_gate_core::GuardCondition;
use requirement_gate_core::GuardContext;
use requirement_gate_core::SessionRecord;

// ============================================================================
// SECTION: Protected Branch
// ============================================================================

/// Denies actions while the current branch is in `protected_branches`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtectedBranchGuard;

impl GuardCondition for ProtectedBranchGuard {
    fn evaluate(&self, ctx: &GuardContext<'_>) -> bool {
        !ctx.spec.protected_branches.iter().any(|protected| protected == ctx.branch.as_str())
    }

    fn denial_reason(&self, ctx: &GuardContext<'_>) -> String {
        format!("Branch `{}` is protected. Create a feature branch before editing.", ctx.branch)
    }
}

// ============================================================================
// SECTION: Single Session Per Branch
// ============================================================================

/// Denies actions while another recent session works on the same branch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleSessionGuard;

impl SingleSessionGuard {
    /// Returns other sessions active on the context's project and branch.
    #[must_use]
    pub fn competing_sessions(ctx: &GuardContext<'_>) -> Vec<SessionRecord> {
        let stale_millis = i64::try_from(ctx.spec.stale_after_seconds).unwrap_or(i64::MAX / 1_000).saturating_mul(1_000);
        ctx.sessions
            .list()
            .unwrap_or_default()
            .into_iter()
            .filter(|record| {
                record.session != *ctx.session
                    && record.project == ctx.project
                    && record.branch == *ctx.branch
                    && record.last_seen.elapsed_millis(ctx.now) <= stale_millis
            })
            .collect()
    }
}

impl GuardCondition for SingleSessionGuard {
    fn evaluate(&self, ctx: &GuardContext<'_>) -> bool {
        Self::competing_sessions(ctx).is_empty()
    }

    fn denial_reason(&self, ctx: &GuardContext<'_>) -> String {
        let others: Vec<String> =
            Self::competing_sessions(ctx).into_iter().map(|record| record.session.to_string()).collect();
        format!(
            "Another session is already working on branch `{}` ({}). Finish it or wait for it to go idle.",
            ctx.branch,
            others.join(", ")
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
