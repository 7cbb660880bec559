//! Live key-value storage adapter backed by a directory on disk.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{trace, warn};
use uuid::Uuid;

use crate::ports::storage::KeyValueStore;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);
/// A lock file older than this is left over from a crashed writer.
const STALE_LOCK_AGE: Duration = Duration::from_secs(10);
const LOCK_RETRY: Duration = Duration::from_millis(5);

/// Persistent storage scope holding one file per key under `root`.
///
/// Values are written to a temporary file first and then moved into place,
/// so a failed write never leaves a truncated value behind.
/// [`KeyValueStore::insert_if_absent`] hard-links the temporary file to the
/// key path, which fails atomically when the key already exists. The scope
/// directory must therefore live on a filesystem that supports hard links;
/// elsewhere the first allocation fails with a storage error.
///
/// Conditional writers also hold an advisory `.<key>.lock` file, created
/// with `create_new`, so that [`KeyValueStore::replace_if`] is a real
/// compare-and-set across processes sharing the directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
    lock_timeout: Duration,
}

/// Removes the lock file when dropped.
struct KeyLock {
    path: PathBuf,
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

impl FileKeyValueStore {
    /// Creates a store rooted at the given scope directory.
    ///
    /// The directory is created on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), lock_timeout: DEFAULT_LOCK_TIMEOUT }
    }

    /// Sets how long a conditional write waits for another writer's lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Returns the scope directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self, key: &str) -> Result<KeyLock, Box<dyn std::error::Error + Send + Sync>> {
        fs::create_dir_all(&self.root)
            .map_err(|e| format!("Failed to create {}: {e}", self.root.display()))?;
        let path = self.root.join(format!(".{key}.lock"));
        let deadline = Instant::now() + self.lock_timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(KeyLock { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        warn!(path = %path.display(), "removing stale lock");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(format!("Timed out waiting for lock {}", path.display()).into());
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(format!("Failed to lock {}: {e}", path.display()).into()),
            }
        }
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
        if !valid {
            return Err(format!("Invalid storage key {key:?}").into());
        }
        Ok(self.root.join(key))
    }

    fn write_temp(&self, key: &str, value: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .and_then(|mut file| {
                file.write_all(value.as_bytes())?;
                file.sync_all()
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(tmp)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Failed to read {}: {e}", path.display()).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let path = self.key_path(key)?;
        let tmp = self
            .write_temp(key, value)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(format!("Failed to replace {}: {e}", path.display()).into());
        }
        trace!(path = %path.display(), "stored value");
        Ok(())
    }

    fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.key_path(key)?;
        let _lock = self.lock(key)?;
        let tmp = self
            .write_temp(key, value)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => {
                trace!(path = %path.display(), "inserted value");
                Ok(None)
            }
            // Removed again before we could read it back; report it as empty
            // so the caller overwrites it.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Ok(Some(self.get(key)?.unwrap_or_default()))
            }
            Err(e) => Err(format!("Failed to create {}: {e}", path.display()).into()),
        }
    }

    fn replace_if(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        self.key_path(key)?;
        let _lock = self.lock(key)?;
        match self.get(key)? {
            Some(current) if current != expected => Ok(Some(current)),
            _ => {
                self.set(key, value)?;
                Ok(None)
            }
        }
    }

    fn remove(&self, key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to remove {}: {e}", path.display()).into()),
        }
    }
}
