//! Recording adapter for the `IdGenerator` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::IdGenerator;

/// Records ID generator interactions while delegating to an inner implementation.
pub struct RecordingIdGenerator {
    inner: Box<dyn IdGenerator>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingIdGenerator {
    /// Creates a new recording ID generator wrapping the given implementation.
    pub fn new(inner: Box<dyn IdGenerator>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl IdGenerator for RecordingIdGenerator {
    fn generate_id(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let result = self.inner.generate_id();
        record_result(&self.recorder, "id_gen", "generate_id", &(), &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::id_gen::LiveIdGenerator;
    use crate::cassette::format::Cassette;

    #[test]
    fn records_generate_id_interaction() {
        let dir = std::env::temp_dir().join(format!("anonid_rec_id_gen_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("id_gen.cassette.yaml");

        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "abc")));

        // Scope the adapter so it's dropped before we try to unwrap
        let id = {
            let gen =
                RecordingIdGenerator::new(Box::new(LiveIdGenerator::new()), Arc::clone(&recorder));
            gen.generate_id().unwrap()
        };

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let cassette: Cassette = serde_yaml::from_str(&content).unwrap();
        assert_eq!(cassette.interactions.len(), 1);
        assert_eq!(cassette.interactions[0].port, "id_gen");
        assert_eq!(cassette.interactions[0].method, "generate_id");
        assert_eq!(cassette.interactions[0].output, serde_json::json!({ "ok": id }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
