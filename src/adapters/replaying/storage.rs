//! Replaying adapter for the `KeyValueStore` port.

use std::sync::Mutex;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::storage::KeyValueStore;

/// Replays recorded storage operations from a cassette.
///
/// Inputs are not checked against the recording; outputs are served in
/// the order they were recorded for each method.
pub struct ReplayingKeyValueStore {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingKeyValueStore {
    /// Creates a new replaying store from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl KeyValueStore for ReplayingKeyValueStore {
    fn get(&self, _key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let output = next_output(&self.replayer, "store", "get");
        replay_result(&output, "store::get")
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let output = next_output(&self.replayer, "store", "set");
        replay_result(&output, "store::set")
    }

    fn insert_if_absent(
        &self,
        _key: &str,
        _value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let output = next_output(&self.replayer, "store", "insert_if_absent");
        replay_result(&output, "store::insert_if_absent")
    }

    fn replace_if(
        &self,
        _key: &str,
        _expected: &str,
        _value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let output = next_output(&self.replayer, "store", "replace_if");
        replay_result(&output, "store::replace_if")
    }

    fn remove(&self, _key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let output = next_output(&self.replayer, "store", "remove");
        replay_result(&output, "store::remove")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn make_replayer(interactions: Vec<Interaction>) -> CassetteReplayer {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            version: "0.1.0".into(),
            interactions,
        };
        CassetteReplayer::new(&cassette)
    }

    fn store_call(seq: u64, method: &str, output: serde_json::Value) -> Interaction {
        Interaction {
            seq,
            port: "store".into(),
            method: method.into(),
            input: json!({"key": "anon_id"}),
            output,
        }
    }

    #[test]
    fn replays_get_hit_and_miss() {
        let replayer = make_replayer(vec![
            store_call(0, "get", json!({"ok": null})),
            store_call(1, "get", json!({"ok": "abc-123"})),
        ]);
        let store = ReplayingKeyValueStore::new(replayer);
        assert_eq!(store.get("anon_id").unwrap(), None);
        assert_eq!(store.get("anon_id").unwrap().as_deref(), Some("abc-123"));
    }

    #[test]
    fn replays_write_failure() {
        let replayer = make_replayer(vec![store_call(0, "set", json!({"err": "quota exceeded"}))]);
        let store = ReplayingKeyValueStore::new(replayer);
        let err = store.set("anon_id", "x").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn replays_insert_if_absent() {
        let replayer = make_replayer(vec![store_call(0, "insert_if_absent", json!({"ok": null}))]);
        let store = ReplayingKeyValueStore::new(replayer);
        assert_eq!(store.insert_if_absent("anon_id", "x").unwrap(), None);
    }

    #[test]
    fn replays_replace_if_conflict() {
        let replayer = make_replayer(vec![store_call(0, "replace_if", json!({"ok": "winner-id"}))]);
        let store = ReplayingKeyValueStore::new(replayer);
        assert_eq!(store.replace_if("anon_id", "", "x").unwrap().as_deref(), Some("winner-id"));
    }

    #[test]
    #[should_panic(expected = "Cassette exhausted")]
    fn exhausted_cassette_panics() {
        let store = ReplayingKeyValueStore::new(make_replayer(vec![]));
        let _ = store.remove("anon_id");
    }
}
