// crates/requirement-gate-cli/src/lib.rs
// ============================================================================
// Module: Requirement Gate CLI Library
// Description: Shared helpers behind the `req` binary.
// Purpose: Expose message formatting, service wiring, and hook adapters for tests.
// Dependencies: requirement-gate-core, requirement-gate-config, serde_json
// ============================================================================

//! ## Overview
//! The `req` binary is a thin dispatcher. Everything worth testing lives here:
//! [`messages`] holds the user-facing string catalog, [`wiring`] assembles
//! file-backed services for a working directory, and [`hooks`] translates host
//! lifecycle payloads into gate decisions.

pub mod hooks;
pub mod messages;
pub mod wiring;
