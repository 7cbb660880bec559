//! ID generator port for producing unique identifiers.

/// Generates unique identifiers from a strong randomness source.
///
/// Abstracting ID generation allows deterministic replay by substituting
/// a predictable sequence during tests and cassette playback.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    ///
    /// # Errors
    ///
    /// Returns an error if the randomness source is unavailable.
    fn generate_id(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}
