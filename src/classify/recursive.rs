//! Recursive entity classifier
//!
//! Walks an arbitrary JSON tree and classifies every object node by its key
//! shape. A node becomes at most one record, tried in this order:
//!
//! ```text
//! chat     one of message/message_content/text/body/content with a scalar value
//! call     duration + one of caller/caller_number/number/receiver/receiver_number/callee
//! contact  name|display_name + a phone-like or email-like key
//! media    filename, or a path-like key + a type-like key
//! ```
//!
//! Classification never stops the walk: children of a classified node are
//! still visited. Nesting deeper than `max_depth` is not visited and counted
//! in [`TreeOutcome::truncated_nodes`].

use serde_json::{Map, Value};
use tracing::warn;

use super::aliases::{role_row, KeyView, CALL_ALIASES, CHAT_ALIASES, CONTACT_ALIASES, MEDIA_ALIASES};
use super::columns::ColumnRole;
use crate::config::EngineConfig;
use crate::extract::records::{build_call, build_chat, build_contact, build_media};
use crate::normalize::value_to_text;
use crate::types::{Provenance, RecordBatch};

/// Extractor label stamped on records found by the tree walk
pub const RECURSIVE_EXTRACTOR: &str = "recursive";

/// Metadata key holding the JSON pointer of the classified node
pub const NODE_PATH_KEY: &str = "node_path";

const CHAT_CONTENT_KEYS: &[&str] = &["message", "message_content", "text", "body", "content"];
const CALL_DURATION_KEYS: &[&str] = &["duration", "call_duration"];
const CALL_PARTY_KEYS: &[&str] = &[
    "caller", "caller_number", "number", "receiver", "receiver_number", "callee",
];
const CONTACT_NAME_KEYS: &[&str] = &["name", "display_name"];
const CONTACT_PHONE_KEYS: &[&str] = &[
    "phone", "phone_number", "phone_numbers", "phones", "mobile", "number", "numbers",
];
const CONTACT_EMAIL_KEYS: &[&str] = &["email", "email_address", "email_addresses", "emails"];
const MEDIA_FILENAME_KEYS: &[&str] = &["filename", "file_name"];
const MEDIA_PATH_KEYS: &[&str] = &["file_path", "path", "local_path", "filepath"];
const MEDIA_TYPE_KEYS: &[&str] = &["file_type", "mime_type", "mime", "content_type", "type"];

/// Records found in one tree plus how much of it was cut off
#[derive(Debug, Default)]
pub struct TreeOutcome {
    pub batch: RecordBatch,
    /// Container nodes below the depth limit that were not visited
    pub truncated_nodes: usize,
}

/// Classify every object node of `root`
pub fn classify_tree(root: &Value, prov: &Provenance, config: &EngineConfig) -> TreeOutcome {
    let mut walker = TreeWalker {
        prov,
        config,
        outcome: TreeOutcome::default(),
        path: Vec::new(),
    };
    walker.visit(root, 0);

    if walker.outcome.truncated_nodes > 0 {
        warn!(
            "{}: {} nested nodes deeper than {} levels were not classified",
            prov.artifact, walker.outcome.truncated_nodes, config.max_depth
        );
    }
    walker.outcome
}

struct TreeWalker<'a> {
    prov: &'a Provenance,
    config: &'a EngineConfig,
    outcome: TreeOutcome,
    /// Key/index segments from the root to the current node
    path: Vec<String>,
}

impl TreeWalker<'_> {
    fn visit(&mut self, node: &Value, depth: usize) {
        if depth > self.config.max_depth {
            self.outcome.truncated_nodes += 1;
            return;
        }

        match node {
            Value::Object(map) => {
                self.classify_object(map);
                for (key, child) in map {
                    if is_container(child) {
                        self.path.push(key.clone());
                        self.visit(child, depth + 1);
                        self.path.pop();
                    }
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    if is_container(child) {
                        self.path.push(index.to_string());
                        self.visit(child, depth + 1);
                        self.path.pop();
                    }
                }
            }
            _ => {}
        }
    }

    fn classify_object(&mut self, map: &Map<String, Value>) {
        let view = KeyView::new(map);

        if let Some(content) = scalar_content(&view) {
            let mut row = role_row(&view, CHAT_ALIASES);
            row.insert(ColumnRole::Content, Value::String(content));
            if let Some(chat) = build_chat(&row, &self.node_provenance(), self.config) {
                self.outcome.batch.chat_records.push(chat);
                return;
            }
        }

        if view.has_any(CALL_DURATION_KEYS) && view.has_any(CALL_PARTY_KEYS) {
            let row = role_row(&view, CALL_ALIASES);
            if let Some(call) = build_call(&row, &self.node_provenance()) {
                self.outcome.batch.call_records.push(call);
                return;
            }
        }

        if view.has_any(CONTACT_NAME_KEYS) && has_contact_channel(&view) {
            let mut row = role_row(&view, CONTACT_ALIASES);
            if !row.has(ColumnRole::Phone) {
                row.insert(ColumnRole::Phone, values_under(&view, "phone"));
            }
            if !row.has(ColumnRole::Email) {
                row.insert(ColumnRole::Email, values_under(&view, "email"));
            }
            if let Some(contact) = build_contact(&row, &self.node_provenance()) {
                self.outcome.batch.contacts.push(contact);
                return;
            }
        }

        if view.has_any(MEDIA_FILENAME_KEYS)
            || (view.has_any(MEDIA_PATH_KEYS) && view.has_any(MEDIA_TYPE_KEYS))
        {
            let row = role_row(&view, MEDIA_ALIASES);
            if let Some(media) = build_media(&row, &self.node_provenance()) {
                self.outcome.batch.media_files.push(media);
            }
        }
    }

    fn node_provenance(&self) -> Provenance {
        let mut prov = self.prov.clone();
        prov.extras
            .insert(NODE_PATH_KEY.to_string(), Value::String(json_pointer(&self.path)));
        prov
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// First chat content key holding a scalar
fn scalar_content(view: &KeyView<'_>) -> Option<String> {
    CHAT_CONTENT_KEYS
        .iter()
        .find_map(|key| view.get(key).and_then(value_to_text))
}

fn has_contact_channel(view: &KeyView<'_>) -> bool {
    view.has_any(CONTACT_PHONE_KEYS)
        || view.has_any(CONTACT_EMAIL_KEYS)
        || view.keys_containing("phone").next().is_some()
        || view.keys_containing("email").next().is_some()
}

/// Values of every key containing `needle`, as one array
fn values_under(view: &KeyView<'_>, needle: &str) -> Value {
    let values: Vec<Value> = view
        .keys_containing(needle)
        .map(|(_, value)| value.clone())
        .filter(|value| !value.is_null())
        .collect();
    if values.is_empty() {
        Value::Null
    } else {
        Value::Array(values)
    }
}

/// RFC 6901 pointer for a segment list
fn json_pointer(segments: &[String]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn walk(doc: &Value) -> TreeOutcome {
        let prov = Provenance::new("doc.json", "doc.json", RECURSIVE_EXTRACTOR);
        classify_tree(doc, &prov, &EngineConfig::default())
    }

    #[test]
    fn test_nested_chat_found() {
        let doc = json!({
            "export": {"threads": [{"entries": {"message": "deep hello", "sender": "alice"}}]}
        });
        let outcome = walk(&doc);
        assert_eq!(outcome.batch.chat_records.len(), 1);
        let chat = &outcome.batch.chat_records[0];
        assert_eq!(chat.content, "deep hello");
        assert_eq!(chat.sender.as_deref(), Some("alice"));
        assert_eq!(chat.source_metadata["node_path"], "/export/threads/0/entries");
        assert_eq!(chat.source_metadata["extractor"], "recursive");
    }

    #[test]
    fn test_node_gets_one_category() {
        // chat keys and call keys on one node: chat wins
        let doc = json!({"text": "hi", "duration": 10, "caller": "+15550001111"});
        let outcome = walk(&doc);
        assert_eq!(outcome.batch.chat_records.len(), 1);
        assert!(outcome.batch.call_records.is_empty());
    }

    #[test]
    fn test_children_of_classified_node_visited() {
        let doc = json!({
            "message": "parent",
            "replies": [{"message": "child"}]
        });
        let outcome = walk(&doc);
        let contents: Vec<&str> = outcome.batch.chat_records.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["parent", "child"]);
    }

    #[test]
    fn test_object_content_is_not_chat() {
        let doc = json!({"message": {"id": 1}});
        assert!(walk(&doc).batch.chat_records.is_empty());
    }

    #[test]
    fn test_call_and_contact() {
        let doc = json!([
            {"caller": "+15550001111", "receiver": "+15550002222", "duration": "01:05"},
            {"display_name": "Carol", "work_phone": "+44 20 7946 0958"}
        ]);
        let outcome = walk(&doc);
        assert_eq!(outcome.batch.call_records.len(), 1);
        assert_eq!(outcome.batch.call_records[0].duration_seconds, 65);
        assert_eq!(outcome.batch.contacts.len(), 1);
        assert_eq!(outcome.batch.contacts[0].phone_numbers, vec!["+442079460958"]);
    }

    #[test]
    fn test_media_requires_type_with_path() {
        let doc = json!([
            {"path": "/data/x.bin"},
            {"path": "/sdcard/a.jpg", "mime_type": "image/jpeg"},
            {"filename": "b.mp4"}
        ]);
        let outcome = walk(&doc);
        assert_eq!(outcome.batch.media_files.len(), 2);
        assert_eq!(outcome.batch.media_files[0].filename, "a.jpg");
    }

    #[test]
    fn test_depth_limit() {
        let mut doc = json!({"message": "bottom"});
        for _ in 0..5 {
            doc = json!({"child": doc});
        }
        let prov = Provenance::new("doc.json", "doc.json", RECURSIVE_EXTRACTOR);
        let config = EngineConfig { max_depth: 3, ..Default::default() };
        let outcome = classify_tree(&doc, &prov, &config);
        assert!(outcome.batch.chat_records.is_empty());
        assert_eq!(outcome.truncated_nodes, 1);
    }

    #[test]
    fn test_pointer_escaping() {
        assert_eq!(json_pointer(&["a/b".to_string(), "c~d".to_string()]), "/a~1b/c~0d");
    }
}
