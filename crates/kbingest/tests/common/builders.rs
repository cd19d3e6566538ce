//! Builders for backend payloads and file records.

#![allow(dead_code)]

use serde_json::{json, Value};

use kbingest::FileRecord;

/// `GET /api/knowledge_bases` body.
pub fn knowledge_bases_json(bases: &[(&str, &str)]) -> Value {
    Value::Array(
        bases
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name, "description": ""}))
            .collect(),
    )
}

/// Builder for `FileRecord` fixtures.
pub struct RecordBuilder {
    record: FileRecord,
}

impl RecordBuilder {
    /// A record that finished the upload stage with `text`.
    pub fn uploaded(id: &str, name: &str, text: &str) -> Self {
        let mut record = FileRecord::pending(id, name, false);
        record.mark_uploaded(text.to_string(), None);
        Self { record }
    }

    pub fn pending(id: &str, name: &str) -> Self {
        Self {
            record: FileRecord::pending(id, name, false),
        }
    }

    pub fn translated(mut self, text: &str) -> Self {
        self.record.translated_content = text.to_string();
        self.record.need_translation = true;
        self
    }

    pub fn embedded_in(mut self, knowledge_base_id: &str) -> Self {
        self.record.mark_embedded(knowledge_base_id, None);
        self
    }

    pub fn embed_failed(mut self, error: &str) -> Self {
        self.record.mark_embed_failed(error);
        self
    }

    pub fn build(self) -> FileRecord {
        self.record
    }

    /// The record as the backend lists it.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.record).expect("record serializes")
    }
}
