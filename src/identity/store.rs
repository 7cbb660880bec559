//! Lazy allocation and persistent caching of the anonymous identifier.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::id::{AllocationState, AnonymousId};
use crate::context::ServiceContext;
use crate::error::IdentityError;
use crate::ports::{IdGenerator, KeyValueStore};

/// Storage key holding the anonymous identifier. No other key is owned here.
pub const ANON_ID_KEY: &str = "anon_id";

/// Returns a stable per-client identifier, allocating one on first use.
///
/// The storage scope and the randomness source are passed in explicitly.
/// Callers that share a scope across threads should share one store
/// instance; the read-check-write sequence is serialized on an internal
/// lock, and the write itself goes through
/// [`KeyValueStore::insert_if_absent`] so that separate processes racing
/// on the same scope also agree on a single value.
///
/// An empty string stored under [`ANON_ID_KEY`] counts as absent and is
/// replaced by a freshly generated identifier through
/// [`KeyValueStore::replace_if`], so racing callers still converge on one
/// value.
pub struct AnonymousIdentityStore<'a> {
    store: &'a dyn KeyValueStore,
    id_gen: &'a dyn IdGenerator,
    allocation: Mutex<()>,
}

impl<'a> AnonymousIdentityStore<'a> {
    /// Creates a store over the given storage scope and identifier source.
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore, id_gen: &'a dyn IdGenerator) -> Self {
        Self { store, id_gen, allocation: Mutex::new(()) }
    }

    /// Creates a store using the ports bundled in a service context.
    #[must_use]
    pub fn from_context(ctx: &'a ServiceContext) -> Self {
        Self::new(ctx.store.as_ref(), ctx.id_gen.as_ref())
    }

    /// Returns the anonymous identifier for this scope.
    ///
    /// If the scope already holds a non-empty value it is returned verbatim
    /// and nothing is written. Otherwise a new identifier is generated,
    /// persisted, and returned.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::StorageUnavailable`] if the scope cannot be
    /// read or written, and [`IdentityError::IdentifierGenerationFailure`]
    /// if no identifier can be produced. A failed write leaves the scope as
    /// it was.
    pub fn get_anonymous_id(&self) -> Result<AnonymousId, IdentityError> {
        let _guard = self.allocation.lock().unwrap_or_else(PoisonError::into_inner);

        match self.read()? {
            Some(existing) if !existing.is_empty() => {
                debug!(key = ANON_ID_KEY, "anonymous id already allocated");
                Ok(AnonymousId::from(existing))
            }
            Some(_) => {
                warn!(key = ANON_ID_KEY, "stored anonymous id is empty, reallocating");
                let candidate = self.generate()?;
                self.replace_empty(candidate)
            }
            None => self.allocate(),
        }
    }

    /// Returns the stored identifier without allocating one.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::StorageUnavailable`] if the scope cannot be read.
    pub fn peek(&self) -> Result<Option<AnonymousId>, IdentityError> {
        Ok(self.read()?.filter(|value| !value.is_empty()).map(AnonymousId::from))
    }

    /// Returns whether this scope has an identifier yet.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::StorageUnavailable`] if the scope cannot be read.
    pub fn state(&self) -> Result<AllocationState, IdentityError> {
        Ok(self.peek()?.map_or(AllocationState::Unallocated, AllocationState::Allocated))
    }

    /// Like [`Self::get_anonymous_id`], but falls back to an unpersisted
    /// identifier when storage is unavailable.
    ///
    /// The fallback value is fresh on every call.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::IdentifierGenerationFailure`] if no
    /// identifier can be produced at all.
    pub fn get_or_ephemeral(&self) -> Result<AnonymousId, IdentityError> {
        match self.get_anonymous_id() {
            Err(err) if err.is_storage_unavailable() => {
                warn!(error = %err, "falling back to an ephemeral anonymous id");
                self.generate()
            }
            other => other,
        }
    }

    fn read(&self) -> Result<Option<String>, IdentityError> {
        self.store.get(ANON_ID_KEY).map_err(|e| IdentityError::storage(ANON_ID_KEY, e))
    }

    fn generate(&self) -> Result<AnonymousId, IdentityError> {
        self.id_gen.generate_id().map(AnonymousId::from).map_err(IdentityError::generation)
    }

    /// Unallocated to allocated. Adopts a concurrent writer's value if one won.
    fn allocate(&self) -> Result<AnonymousId, IdentityError> {
        let candidate = self.generate()?;
        let winner = self
            .store
            .insert_if_absent(ANON_ID_KEY, candidate.as_str())
            .map_err(|e| IdentityError::storage(ANON_ID_KEY, e))?;

        match winner {
            None => {
                info!(key = ANON_ID_KEY, "allocated anonymous id");
                Ok(candidate)
            }
            Some(existing) if !existing.is_empty() => {
                debug!(key = ANON_ID_KEY, "another writer allocated first");
                Ok(AnonymousId::from(existing))
            }
            Some(_) => self.replace_empty(candidate),
        }
    }

    /// Swaps an empty stored value for `candidate` unless another writer
    /// already did, in which case that writer's value wins.
    fn replace_empty(&self, candidate: AnonymousId) -> Result<AnonymousId, IdentityError> {
        let current = self
            .store
            .replace_if(ANON_ID_KEY, "", candidate.as_str())
            .map_err(|e| IdentityError::storage(ANON_ID_KEY, e))?;

        match current {
            None => {
                info!(key = ANON_ID_KEY, "replaced empty anonymous id");
                Ok(candidate)
            }
            Some(existing) => {
                debug!(key = ANON_ID_KEY, "another writer replaced the empty id first");
                Ok(AnonymousId::from(existing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::adapters::live::id_gen::LiveIdGenerator;

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    /// In-memory storage scope with switchable failures and a write counter.
    #[derive(Default)]
    struct MemStore {
        values: Mutex<HashMap<String, String>>,
        writes: AtomicUsize,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MemStore {
        fn with(key: &str, value: &str) -> Self {
            let store = Self::default();
            store.values.lock().unwrap().insert(key.to_string(), value.to_string());
            store
        }

        fn stored(&self) -> Option<String> {
            self.values.lock().unwrap().get(ANON_ID_KEY).cloned()
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn check_write(&self) -> Result<(), BoxError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err("quota exceeded".into());
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl KeyValueStore for MemStore {
        fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err("storage disabled".into());
            }
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
            self.check_write()?;
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn insert_if_absent(&self, key: &str, value: &str) -> Result<Option<String>, BoxError> {
            let mut values = self.values.lock().unwrap();
            if let Some(existing) = values.get(key) {
                return Ok(Some(existing.clone()));
            }
            self.check_write()?;
            values.insert(key.to_string(), value.to_string());
            Ok(None)
        }

        fn replace_if(
            &self,
            key: &str,
            expected: &str,
            value: &str,
        ) -> Result<Option<String>, BoxError> {
            let mut values = self.values.lock().unwrap();
            match values.get(key) {
                Some(current) if current != expected => Ok(Some(current.clone())),
                _ => {
                    self.check_write()?;
                    values.insert(key.to_string(), value.to_string());
                    Ok(None)
                }
            }
        }

        fn remove(&self, key: &str) -> Result<(), BoxError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Generator yielding a fixed sequence of identifiers.
    struct SeqIdGen {
        next: AtomicUsize,
        ids: Vec<&'static str>,
    }

    impl SeqIdGen {
        fn new(ids: Vec<&'static str>) -> Self {
            Self { next: AtomicUsize::new(0), ids }
        }
    }

    impl IdGenerator for SeqIdGen {
        fn generate_id(&self) -> Result<String, BoxError> {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids[i].to_string())
        }
    }

    struct FailingIdGen;

    impl IdGenerator for FailingIdGen {
        fn generate_id(&self) -> Result<String, BoxError> {
            Err("entropy source unavailable".into())
        }
    }

    /// Scope whose slot is filled by another writer between our read and
    /// our conditional write.
    struct RacedStore {
        inner: MemStore,
        winner: &'static str,
    }

    impl KeyValueStore for RacedStore {
        fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
            self.inner.set(key, value)
        }

        fn insert_if_absent(&self, key: &str, value: &str) -> Result<Option<String>, BoxError> {
            self.inner.set(key, self.winner)?;
            self.inner.insert_if_absent(key, value)
        }

        fn replace_if(
            &self,
            key: &str,
            expected: &str,
            value: &str,
        ) -> Result<Option<String>, BoxError> {
            self.inner.set(key, self.winner)?;
            self.inner.replace_if(key, expected, value)
        }

        fn remove(&self, key: &str) -> Result<(), BoxError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn empty_scope_allocates_and_persists() {
        let mem = MemStore::default();
        let gen = LiveIdGenerator::new();
        let store = AnonymousIdentityStore::new(&mem, &gen);

        let id = store.get_anonymous_id().unwrap();

        assert!(!id.as_str().is_empty());
        assert!(id.is_canonical());
        assert_eq!(mem.stored().as_deref(), Some(id.as_str()));
        assert_eq!(mem.writes(), 1);
    }

    #[test]
    fn repeated_calls_return_first_value_without_writing() {
        let mem = MemStore::default();
        let gen = LiveIdGenerator::new();
        let store = AnonymousIdentityStore::new(&mem, &gen);

        let first = store.get_anonymous_id().unwrap();
        for _ in 0..5 {
            assert_eq!(store.get_anonymous_id().unwrap(), first);
        }
        assert_eq!(mem.writes(), 1);
    }

    #[test]
    fn existing_value_returned_verbatim() {
        let mem = MemStore::with(ANON_ID_KEY, "abc-123");
        let store = AnonymousIdentityStore::new(&mem, &FailingIdGen);

        let id = store.get_anonymous_id().unwrap();

        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(mem.stored().as_deref(), Some("abc-123"));
        assert_eq!(mem.writes(), 0);
    }

    #[test]
    fn independent_scopes_get_different_ids() {
        let gen = LiveIdGenerator::new();
        let (a, b) = (MemStore::default(), MemStore::default());

        let id_a = AnonymousIdentityStore::new(&a, &gen).get_anonymous_id().unwrap();
        let id_b = AnonymousIdentityStore::new(&b, &gen).get_anonymous_id().unwrap();

        assert_ne!(id_a, id_b);
    }

    #[test]
    fn failed_write_reports_storage_unavailable_and_leaves_scope_empty() {
        let mem = MemStore::default();
        mem.fail_writes.store(true, Ordering::SeqCst);
        let gen = LiveIdGenerator::new();
        let store = AnonymousIdentityStore::new(&mem, &gen);

        let err = store.get_anonymous_id().unwrap_err();

        assert!(matches!(err, IdentityError::StorageUnavailable { ref key, .. } if key == ANON_ID_KEY));
        assert!(mem.stored().is_none());
    }

    #[test]
    fn failed_read_reports_storage_unavailable() {
        let mem = MemStore::default();
        mem.fail_reads.store(true, Ordering::SeqCst);
        let gen = LiveIdGenerator::new();
        let store = AnonymousIdentityStore::new(&mem, &gen);

        assert!(store.get_anonymous_id().unwrap_err().is_storage_unavailable());
        assert!(store.peek().unwrap_err().is_storage_unavailable());
    }

    #[test]
    fn generation_failure_is_surfaced_without_writing() {
        let mem = MemStore::default();
        let store = AnonymousIdentityStore::new(&mem, &FailingIdGen);

        let err = store.get_anonymous_id().unwrap_err();

        assert!(matches!(err, IdentityError::IdentifierGenerationFailure { .. }));
        assert_eq!(mem.writes(), 0);
        assert!(mem.stored().is_none());
    }

    #[test]
    fn empty_stored_value_is_reallocated() {
        let mem = MemStore::with(ANON_ID_KEY, "");
        let gen = SeqIdGen::new(vec!["fresh-1"]);
        let store = AnonymousIdentityStore::new(&mem, &gen);

        assert_eq!(store.state().unwrap(), AllocationState::Unallocated);
        let id = store.get_anonymous_id().unwrap();

        assert_eq!(id.as_str(), "fresh-1");
        assert_eq!(mem.stored().as_deref(), Some("fresh-1"));
    }

    #[test]
    fn failed_write_over_empty_value_leaves_it_empty() {
        let mem = MemStore::with(ANON_ID_KEY, "");
        mem.fail_writes.store(true, Ordering::SeqCst);
        let gen = SeqIdGen::new(vec!["fresh-1"]);
        let store = AnonymousIdentityStore::new(&mem, &gen);

        let err = store.get_anonymous_id().unwrap_err();

        assert!(matches!(err, IdentityError::StorageUnavailable { ref key, .. } if key == ANON_ID_KEY));
        assert_eq!(mem.stored().as_deref(), Some(""));
        assert_eq!(mem.writes(), 0);
    }

    #[test]
    fn losing_a_race_over_an_empty_value_adopts_the_winner() {
        let raced = RacedStore { inner: MemStore::with(ANON_ID_KEY, ""), winner: "winner-id" };
        let gen = SeqIdGen::new(vec!["loser-id"]);
        let store = AnonymousIdentityStore::new(&raced, &gen);

        let id = store.get_anonymous_id().unwrap();

        assert_eq!(id.as_str(), "winner-id");
        assert_eq!(raced.inner.stored().as_deref(), Some("winner-id"));
    }

    #[test]
    fn peek_never_allocates() {
        let mem = MemStore::default();
        let gen = LiveIdGenerator::new();
        let store = AnonymousIdentityStore::new(&mem, &gen);

        assert!(store.peek().unwrap().is_none());
        assert_eq!(store.state().unwrap(), AllocationState::Unallocated);
        assert_eq!(mem.writes(), 0);

        let id = store.get_anonymous_id().unwrap();
        assert_eq!(store.peek().unwrap(), Some(id.clone()));
        assert_eq!(store.state().unwrap(), AllocationState::Allocated(id));
    }

    #[test]
    fn losing_a_race_adopts_the_winner() {
        let raced = RacedStore { inner: MemStore::default(), winner: "winner-id" };
        let gen = SeqIdGen::new(vec!["loser-id"]);
        let store = AnonymousIdentityStore::new(&raced, &gen);

        let id = store.get_anonymous_id().unwrap();

        assert_eq!(id.as_str(), "winner-id");
        assert_eq!(raced.inner.stored().as_deref(), Some("winner-id"));
    }

    #[test]
    fn concurrent_callers_agree_on_one_value() {
        let mem = MemStore::default();
        let gen = LiveIdGenerator::new();
        let store = AnonymousIdentityStore::new(&mem, &gen);

        let ids: Vec<AnonymousId> = std::thread::scope(|s| {
            let handles: Vec<_> =
                (0..8).map(|_| s.spawn(|| store.get_anonymous_id().unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(mem.writes(), 1);
    }

    #[test]
    fn ephemeral_fallback_when_storage_fails() {
        let mem = MemStore::default();
        mem.fail_writes.store(true, Ordering::SeqCst);
        let gen = SeqIdGen::new(vec!["first", "second"]);
        let store = AnonymousIdentityStore::new(&mem, &gen);

        let id = store.get_or_ephemeral().unwrap();

        assert_eq!(id.as_str(), "second");
        assert!(mem.stored().is_none());
    }

    #[test]
    fn ephemeral_fallback_still_reports_generation_failure() {
        let mem = MemStore::default();
        let store = AnonymousIdentityStore::new(&mem, &FailingIdGen);

        let err = store.get_or_ephemeral().unwrap_err();
        assert!(matches!(err, IdentityError::IdentifierGenerationFailure { .. }));
    }
}
