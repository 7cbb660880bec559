//! Replaying adapters that replay recorded interactions.

pub mod id_gen;
pub mod storage;

pub use id_gen::ReplayingIdGenerator;
pub use storage::ReplayingKeyValueStore;

use std::sync::Mutex;

use crate::cassette::replayer::CassetteReplayer;

/// Take the output of the next `port::method` interaction from a replayer.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut replayer = replayer.lock().expect("replayer lock poisoned");
    let interaction = replayer.next_interaction(port, method);
    interaction.output
}

/// Extracts a Result from a cassette output JSON value.
///
/// Expects `{"ok": <value>}` or `{"err": "message"}`; mirror of
/// `recording::record_result`.
pub(crate) fn replay_result<T: serde::de::DeserializeOwned>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(err) = output.get("err") {
        let msg = err.as_str().unwrap_or("unknown error").to_string();
        return Err(msg.into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}
