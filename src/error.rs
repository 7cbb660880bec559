//! Error types for anonymous identity allocation.

use thiserror::Error;

/// Boxed error returned by port implementations.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced by [`crate::identity::AnonymousIdentityStore`].
///
/// Neither variant is retried; callers propagate or degrade.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The persistent storage scope could not be read or written.
    #[error("Storage unavailable for key {key:?}: {source}")]
    StorageUnavailable {
        /// Key being accessed when the failure occurred.
        key: String,
        /// Underlying storage error.
        #[source]
        source: PortError,
    },

    /// The randomness source could not produce an identifier.
    #[error("Identifier generation failed: {source}")]
    IdentifierGenerationFailure {
        /// Underlying generator error.
        #[source]
        source: PortError,
    },
}

impl IdentityError {
    pub(crate) fn storage(key: &str, source: PortError) -> Self {
        Self::StorageUnavailable { key: key.to_string(), source }
    }

    pub(crate) fn generation(source: PortError) -> Self {
        Self::IdentifierGenerationFailure { source }
    }

    /// Returns `true` for [`IdentityError::StorageUnavailable`].
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}
