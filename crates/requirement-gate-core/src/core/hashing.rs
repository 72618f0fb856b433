// crates/requirement-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Requirement Gate Hashing
// Description: Content hashing for cache keys and message fingerprints.
// Purpose: Provide short, stable digests without storing raw text in caches.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Cache files live outside version control and may be shared across
//! repositories, so keys and message fingerprints are stored as SHA-256 hex
//! digests rather than raw paths or denial text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_encode(&digest)
}

/// Returns a digest over `parts` joined by a unit separator.
///
/// The separator keeps `["ab", "c"]` and `["a", "bc"]` distinct.
#[must_use]
pub fn composite_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update([0x1f_u8]);
        }
        hasher.update(part.as_bytes());
    }
    hex_encode(&hasher.finalize())
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
