//! Recording adapter for the `KeyValueStore` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::KeyValueStore;

/// Records storage interactions while delegating to an inner implementation.
pub struct RecordingKeyValueStore {
    inner: Box<dyn KeyValueStore>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingKeyValueStore {
    /// Creates a new recording store wrapping the given implementation.
    pub fn new(inner: Box<dyn KeyValueStore>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct KeyInput<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct WriteInput<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct ReplaceInput<'a> {
    key: &'a str,
    expected: &'a str,
    value: &'a str,
}

impl KeyValueStore for RecordingKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.get(key);
        record_result(&self.recorder, "store", "get", &KeyInput { key }, &result);
        result
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.set(key, value);
        record_result(&self.recorder, "store", "set", &WriteInput { key, value }, &result);
        result
    }

    fn insert_if_absent(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.insert_if_absent(key, value);
        let input = WriteInput { key, value };
        record_result(&self.recorder, "store", "insert_if_absent", &input, &result);
        result
    }

    fn replace_if(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.replace_if(key, expected, value);
        let input = ReplaceInput { key, expected, value };
        record_result(&self.recorder, "store", "replace_if", &input, &result);
        result
    }

    fn remove(&self, key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.remove(key);
        record_result(&self.recorder, "store", "remove", &KeyInput { key }, &result);
        result
    }
}
