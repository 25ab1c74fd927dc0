//! Role rows and the record builders shared by every extractor
//!
//! Each extractor reduces its input (a table row, a CSV record, a JSON
//! object, an XML element) to a [`RoleRow`], a map from [`ColumnRole`] to a
//! raw value, and hands it to one of the `build_*` functions. Normalization
//! of timestamps, durations, sizes and phone numbers happens here and only
//! here.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::classify::{ColumnRole, ColumnRoles};
use crate::config::EngineConfig;
use crate::normalize::{
    clean_phone_number, coerce_bool, coerce_duration, coerce_file_size, coerce_timestamp,
    value_to_text,
};
use crate::types::{
    CallRecord, ChatRecord, Contact, MediaFile, Provenance, RecordBatch, SourceMetadata,
};

/// Default chat message type
pub const DEFAULT_MESSAGE_TYPE: &str = "text";
/// Default call type when the source names no direction
pub const DEFAULT_CALL_TYPE: &str = "unknown";

/// Separators for multi-valued phone/email cells
const MULTI_VALUE_SEPARATORS: &[char] = &[',', ';', '|', '\n'];

/// One row of raw values keyed by semantic role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleRow {
    values: BTreeMap<ColumnRole, Value>,
    /// Vendor metadata carried into `source_metadata`
    metadata: SourceMetadata,
}

impl RoleRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row from positional values using a column classification
    pub fn from_columns(roles: &ColumnRoles, row: &[Value]) -> Self {
        let mut out = Self::new();
        for (role, idx) in roles.assignments() {
            if let Some(value) = row.get(idx) {
                out.insert(role, value.clone());
            }
        }
        out
    }

    /// Null values are not stored
    pub fn insert(&mut self, role: ColumnRole, value: Value) {
        if !value.is_null() {
            self.values.insert(role, value);
        }
    }

    pub fn insert_text(&mut self, role: ColumnRole, text: Option<String>) {
        if let Some(text) = text {
            self.insert(role, Value::String(text));
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn metadata_mut(&mut self) -> &mut SourceMetadata {
        &mut self.metadata
    }

    pub fn get(&self, role: ColumnRole) -> Option<&Value> {
        self.values.get(&role)
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.values.contains_key(&role)
    }

    /// Scalar text for `role`, trimmed and non-empty
    pub fn text(&self, role: ColumnRole) -> Option<String> {
        self.get(role).and_then(value_to_text)
    }

    fn timestamp(&self, role: ColumnRole) -> Option<chrono::DateTime<chrono::Utc>> {
        self.get(role).and_then(coerce_timestamp)
    }

    /// All text values for a possibly multi-valued role
    fn multi_text(&self, role: ColumnRole) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(value) = self.get(role) {
            collect_multi(value, &mut out);
        }
        out
    }
}

fn collect_multi(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_multi(item, out);
            }
        }
        Value::Object(map) => {
            // {"number": "..."} / {"value": "..."} wrappers
            for key in ["number", "value", "address", "email", "phone"] {
                if let Some(inner) = map.get(key) {
                    collect_multi(inner, out);
                    break;
                }
            }
        }
        other => {
            if let Some(text) = value_to_text(other) {
                out.extend(
                    text.split(MULTI_VALUE_SEPARATORS)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Chat record; rows without message content yield nothing
pub fn build_chat(row: &RoleRow, prov: &Provenance, config: &EngineConfig) -> Option<ChatRecord> {
    let content = row.text(ColumnRole::Content)?;
    Some(ChatRecord {
        app_name: row
            .text(ColumnRole::AppName)
            .unwrap_or_else(|| config.fallback_app_name.clone()),
        sender: row.text(ColumnRole::Sender).or_else(|| row.text(ColumnRole::Phone)),
        receiver: row.text(ColumnRole::Receiver),
        content,
        timestamp: row
            .timestamp(ColumnRole::Timestamp)
            .or_else(|| row.timestamp(ColumnRole::Created)),
        message_type: row
            .text(ColumnRole::Kind)
            .unwrap_or_else(|| DEFAULT_MESSAGE_TYPE.to_string()),
        is_deleted: row.get(ColumnRole::Deleted).map(coerce_bool).unwrap_or(false),
        source_metadata: prov.stamp(row.metadata.clone()),
    })
}

/// Call record; needs at least one participant
pub fn build_call(row: &RoleRow, prov: &Provenance) -> Option<CallRecord> {
    let caller = row.text(ColumnRole::Sender).or_else(|| row.text(ColumnRole::Phone));
    let receiver = row.text(ColumnRole::Receiver);
    if caller.is_none() && receiver.is_none() {
        return None;
    }
    Some(CallRecord {
        caller,
        receiver,
        call_type: row
            .text(ColumnRole::Kind)
            .unwrap_or_else(|| DEFAULT_CALL_TYPE.to_string()),
        duration_seconds: row.get(ColumnRole::Duration).map(coerce_duration).unwrap_or(0),
        timestamp: row
            .timestamp(ColumnRole::Timestamp)
            .or_else(|| row.timestamp(ColumnRole::Created)),
        source_metadata: prov.stamp(row.metadata.clone()),
    })
}

/// Contact record; needs a non-empty name
pub fn build_contact(row: &RoleRow, prov: &Provenance) -> Option<Contact> {
    let name = row.text(ColumnRole::Name)?;

    let mut phone_numbers: Vec<String> = Vec::new();
    for raw in row.multi_text(ColumnRole::Phone) {
        if let Some(phone) = clean_phone_number(&raw) {
            if !phone_numbers.contains(&phone) {
                phone_numbers.push(phone);
            }
        }
    }

    let mut email_addresses: Vec<String> = Vec::new();
    for raw in row.multi_text(ColumnRole::Email) {
        if raw.contains('@') && !email_addresses.contains(&raw) {
            email_addresses.push(raw);
        }
    }

    Some(Contact {
        name,
        phone_numbers,
        email_addresses,
        source_metadata: prov.stamp(row.metadata.clone()),
    })
}

/// Media record; filename falls back to the last path component
pub fn build_media(row: &RoleRow, prov: &Provenance) -> Option<MediaFile> {
    let file_path = row.text(ColumnRole::Path);
    let filename = row
        .text(ColumnRole::Filename)
        .or_else(|| file_path.as_deref().and_then(file_name_of))?;

    Some(MediaFile {
        filename,
        file_path,
        file_type: row.text(ColumnRole::Mime),
        file_size_bytes: row.get(ColumnRole::Size).map(coerce_file_size).unwrap_or(0),
        created_at: row.timestamp(ColumnRole::Created),
        modified_at: row.timestamp(ColumnRole::Modified),
        hash_md5: row.text(ColumnRole::HashMd5).map(|h| h.to_lowercase()),
        hash_sha256: row.text(ColumnRole::HashSha256).map(|h| h.to_lowercase()),
        source_metadata: prov.stamp(row.metadata.clone()),
    })
}

/// Last component of a device or archive path (either separator)
pub fn file_name_of(path: &str) -> Option<String> {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Tables
// =============================================================================

/// Run every open category gate over in-memory rows
///
/// Used by the delimited-text and tabular-JSON paths; the relational path
/// queries each category separately instead.
pub fn batch_from_table(
    roles: &ColumnRoles,
    rows: &[Vec<Value>],
    prov: &Provenance,
    config: &EngineConfig,
) -> RecordBatch {
    let role_rows: Vec<RoleRow> = rows.iter().map(|row| RoleRow::from_columns(roles, row)).collect();
    let mut batch = RecordBatch::default();

    if roles.is_chat_candidate() {
        batch.chat_records = role_rows.iter().filter_map(|r| build_chat(r, prov, config)).collect();
    }
    if roles.is_call_candidate() {
        batch.call_records = role_rows.iter().filter_map(|r| build_call(r, prov)).collect();
    }
    if roles.is_contact_candidate() {
        batch.contacts = role_rows.iter().filter_map(|r| build_contact(r, prov)).collect();
    }
    if roles.is_media_candidate() {
        batch.media_files = role_rows.iter().filter_map(|r| build_media(r, prov)).collect();
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_columns;
    use serde_json::json;

    fn prov() -> Provenance {
        Provenance::new("test.db", "messages", "relational")
    }

    #[test]
    fn test_chat_defaults() {
        let mut row = RoleRow::new();
        row.insert(ColumnRole::Content, json!("hello"));
        row.insert(ColumnRole::Sender, json!("+15551234567"));
        let chat = build_chat(&row, &prov(), &EngineConfig::default()).unwrap();
        assert_eq!(chat.app_name, "Unknown");
        assert_eq!(chat.message_type, "text");
        assert_eq!(chat.receiver, None);
        assert!(!chat.is_deleted);
        assert_eq!(chat.source_metadata["source"], "messages");
    }

    #[test]
    fn test_chat_without_content_is_dropped() {
        let mut row = RoleRow::new();
        row.insert(ColumnRole::Content, json!("   "));
        row.insert(ColumnRole::Sender, json!("alice"));
        assert!(build_chat(&row, &prov(), &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_null_values_not_stored() {
        let mut row = RoleRow::new();
        row.insert(ColumnRole::Content, Value::Null);
        assert!(!row.has(ColumnRole::Content));
    }

    #[test]
    fn test_call_requires_participant() {
        let mut row = RoleRow::new();
        row.insert(ColumnRole::Duration, json!(30));
        assert!(build_call(&row, &prov()).is_none());

        row.insert(ColumnRole::Phone, json!("+15550001111"));
        let call = build_call(&row, &prov()).unwrap();
        assert_eq!(call.caller.as_deref(), Some("+15550001111"));
        assert_eq!(call.duration_seconds, 30);
        assert_eq!(call.call_type, "unknown");
    }

    #[test]
    fn test_contact_multi_values() {
        let mut row = RoleRow::new();
        row.insert(ColumnRole::Name, json!("Bob"));
        row.insert(ColumnRole::Phone, json!("+1 (555) 123-4567; 0044 20 7946 0958, 12"));
        row.insert(ColumnRole::Email, json!(["bob@example.com", "not-an-email"]));
        let contact = build_contact(&row, &prov()).unwrap();
        assert_eq!(contact.phone_numbers, vec!["+15551234567", "+442079460958"]);
        assert_eq!(contact.email_addresses, vec!["bob@example.com"]);
    }

    #[test]
    fn test_media_filename_from_path() {
        let mut row = RoleRow::new();
        row.insert(ColumnRole::Path, json!("/sdcard/DCIM/Camera/IMG_0001.jpg"));
        row.insert(ColumnRole::Size, json!("2 KB"));
        row.insert(ColumnRole::HashMd5, json!("ABCDEF"));
        let media = build_media(&row, &prov()).unwrap();
        assert_eq!(media.filename, "IMG_0001.jpg");
        assert_eq!(media.file_size_bytes, 2048);
        assert_eq!(media.hash_md5.as_deref(), Some("abcdef"));
    }

    #[test]
    fn test_file_name_of_windows_path() {
        assert_eq!(file_name_of(r"C:\Users\x\photo.png").as_deref(), Some("photo.png"));
        assert_eq!(file_name_of("/"), None);
    }

    #[test]
    fn test_batch_from_table_sms() {
        let roles = classify_columns(&["address", "body", "date"]);
        let rows = vec![
            vec![json!("+15551230001"), json!("one"), json!(1_700_000_000_000i64)],
            vec![json!("+15551230002"), json!("two"), json!(1_700_000_100_000i64)],
            vec![json!("+15551230003"), Value::Null, json!(1_700_000_200_000i64)],
        ];
        let batch = batch_from_table(&roles, &rows, &prov(), &EngineConfig::default());
        assert_eq!(batch.chat_records.len(), 2);
        assert!(batch.call_records.is_empty());
        assert!(batch.chat_records[0].timestamp.is_some());
    }
}
