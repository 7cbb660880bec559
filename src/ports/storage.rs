//! Key-value storage port for the persistent storage scope.

/// A client-scoped key-value store whose contents outlive a single process.
///
/// Every method addresses one scope; callers never see other scopes.
/// Implementations must not leave a partially written value behind when
/// a write fails.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Stores `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope cannot be written (disabled, full, etc.).
    fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Stores `value` under `key` only if the key is absent.
    ///
    /// Returns `None` when `value` was stored, or `Some(existing)` when
    /// another writer got there first. The check and the write are atomic
    /// with respect to other writers of the same scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope cannot be read or written.
    fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Stores `value` under `key` if the key is absent or still holds
    /// `expected`.
    ///
    /// Returns `None` when `value` was stored, or `Some(current)` when the
    /// key holds something else. Atomic with respect to other
    /// `insert_if_absent` and `replace_if` callers on the same scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope cannot be read or written.
    fn replace_if(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Removes `key` from the scope. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope cannot be written.
    fn remove(&self, key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
