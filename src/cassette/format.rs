//! Cassette data structures for recording and replaying interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded call on a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name (`store` or `id_gen`).
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Arguments passed to the port.
    pub input: serde_json::Value,
    /// Value returned by the port, as `{"ok": ..}` or `{"err": ..}`.
    pub output: serde_json::Value,
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Version of `anonid` that recorded it.
    pub version: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Number of interactions recorded for the given port.
    #[must_use]
    pub fn count_for(&self, port: &str) -> usize {
        self.interactions.iter().filter(|i| i.port == port).count()
    }
}
