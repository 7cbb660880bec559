//! The anonymous identifier value type.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a hyphenated UUID in text form (8-4-4-4-12).
const CANONICAL_LEN: usize = 36;

/// Opaque identifier correlating activity from a client that has not signed in.
///
/// Values read back from storage are carried verbatim, so an `AnonymousId`
/// is not guaranteed to be a UUID. Freshly generated values always are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymousId(String);

impl AnonymousId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns `true` if the value is a lowercase hyphenated UUID.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.0.len() == CANONICAL_LEN
            && !self.0.bytes().any(|b| b.is_ascii_uppercase())
            && Uuid::try_parse(&self.0).is_ok()
    }
}

impl From<String> for AnonymousId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AnonymousId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for AnonymousId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnonymousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocation state of a storage scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationState {
    /// No identifier has been stored in the scope yet.
    Unallocated,
    /// The scope holds this identifier.
    Allocated(AnonymousId),
}

impl AllocationState {
    /// Returns `true` if the scope holds an identifier.
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        matches!(self, Self::Allocated(_))
    }
}
