//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::storage::FileKeyValueStore;
use crate::adapters::recording::{RecordingIdGenerator, RecordingKeyValueStore};
use crate::adapters::replaying::{ReplayingIdGenerator, ReplayingKeyValueStore};
use crate::cassette::config::CassetteConfig;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::id_gen::IdGenerator;
use crate::ports::storage::KeyValueStore;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Persistent storage scope.
    pub store: Box<dyn KeyValueStore>,
    /// Source of fresh identifiers.
    pub id_gen: Box<dyn IdGenerator>,
}

impl ServiceContext {
    /// Creates a live context over the storage scope at `store_dir`.
    #[must_use]
    pub fn live(store_dir: &Path) -> Self {
        Self {
            store: Box::new(FileKeyValueStore::new(store_dir)),
            id_gen: Box::new(LiveIdGenerator::new()),
        }
    }

    /// Creates a live context whose port calls are captured by `session`.
    ///
    /// Drop the context before calling [`RecordingSession::finish`].
    #[must_use]
    pub fn recording(store_dir: &Path, session: &RecordingSession) -> Self {
        Self {
            store: Box::new(RecordingKeyValueStore::new(
                Box::new(FileKeyValueStore::new(store_dir)),
                Arc::clone(&session.store),
            )),
            id_gen: Box::new(RecordingIdGenerator::new(
                Box::new(LiveIdGenerator::new()),
                Arc::clone(&session.id_gen),
            )),
        }
    }

    /// Creates a replaying context from a monolithic cassette file.
    ///
    /// Each port gets its own replayer over the same cassette, so per-port
    /// cursors are independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = CassetteConfig::read_cassette(path)?;

        Ok(Self {
            store: Box::new(ReplayingKeyValueStore::new(CassetteReplayer::new(&cassette))),
            id_gen: Box::new(ReplayingIdGenerator::new(CassetteReplayer::new(&cassette))),
        })
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette file use a panicking adapter that
    /// fails with a clear message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            store: match replayers.store {
                Some(r) => Box::new(ReplayingKeyValueStore::new(r)),
                None => Box::new(PanickingKeyValueStore),
            },
            id_gen: match replayers.id_gen {
                Some(r) => Box::new(ReplayingIdGenerator::new(r)),
                None => Box::new(PanickingIdGenerator),
            },
        })
    }
}

// --- Panicking adapters for unspecified ports ---

struct PanickingKeyValueStore;

impl PanickingKeyValueStore {
    fn fail() -> ! {
        panic!("KeyValueStore port not configured in CassetteConfig: no cassette loaded for store");
    }
}

impl KeyValueStore for PanickingKeyValueStore {
    fn get(&self, _key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Self::fail()
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Self::fail()
    }

    fn insert_if_absent(
        &self,
        _key: &str,
        _value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Self::fail()
    }

    fn replace_if(
        &self,
        _key: &str,
        _expected: &str,
        _value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Self::fail()
    }

    fn remove(&self, _key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Self::fail()
    }
}

struct PanickingIdGenerator;

impl IdGenerator for PanickingIdGenerator {
    fn generate_id(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        panic!("IdGenerator port not configured in CassetteConfig: no cassette loaded for id_gen");
    }
}
