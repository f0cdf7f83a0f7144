//! Opaque host-layer identifiers.
//!
//! The host application assigns its own identity to every layer it renders.
//! The catalog records that identity as an opaque token and never
//! dereferences it directly: the host may drop the layer at any time, at
//! which point the token is invalid and the owning entry must fall back to
//! the unmapped state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque identifier for a layer active in the host session.
///
/// This is a weak back-reference. The catalog holds it for lookup and
/// exchange operations but never owns the host layer behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostLayerId(String);

impl HostLayerId {
    /// Wraps a host-assigned identifier.
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

impl fmt::Display for HostLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostLayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HostLayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
