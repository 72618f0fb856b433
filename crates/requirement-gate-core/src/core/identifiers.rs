// crates/requirement-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Requirement Gate Identifiers
// Description: Opaque identifiers for requirements, sessions, and branches.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings supplied by configuration or by the host.
//! They serialize transparently so persisted state documents stay readable.
//! No normalization is applied; callers own the exact spelling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Requirement name as declared in configuration.
///
/// # Invariants
/// - Opaque UTF-8 string; used as a map key in configuration and state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementName(String);

impl RequirementName {
    /// Creates a new requirement name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for RequirementName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequirementName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RequirementName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Host-supplied session identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; used purely as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Version-control branch name.
///
/// # Invariants
/// - Opaque UTF-8 string as reported by version control (may contain `/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a new branch name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a filesystem-safe, injective encoding of the branch name.
    ///
    /// Bytes outside `[A-Za-z0-9._-]` are percent-encoded, so `feature/x`
    /// and `feature-x` never share a file.
    #[must_use]
    pub fn file_stem(&self) -> String {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let mut out = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
                out.push(char::from(byte));
            } else {
                out.push('%');
                out.push(char::from(HEX[usize::from(byte >> 4)]));
                out.push(char::from(HEX[usize::from(byte & 0x0f)]));
            }
        }
        out
    }

    /// Decodes a file stem produced by [`BranchName::file_stem`].
    ///
    /// Returns `None` when the stem is not a valid encoding.
    #[must_use]
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let bytes = stem.as_bytes();
        let mut decoded = Vec::with_capacity(bytes.len());
        let mut index = 0;
        while index < bytes.len() {
            if bytes[index] == b'%' {
                let hi = bytes.get(index + 1).and_then(|b| char::from(*b).to_digit(16))?;
                let lo = bytes.get(index + 2).and_then(|b| char::from(*b).to_digit(16))?;
                decoded.push(u8::try_from(hi * 16 + lo).ok()?);
                index += 3;
            } else {
                decoded.push(bytes[index]);
                index += 1;
            }
        }
        String::from_utf8(decoded).ok().map(Self)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BranchName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BranchName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
