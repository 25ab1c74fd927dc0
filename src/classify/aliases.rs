//! Key aliases for object-shaped sources
//!
//! Column classification ([`super::columns`]) guesses roles from arbitrary
//! column names. Objects in JSON documents use a smaller, better known key
//! vocabulary, so they are mapped through fixed alias lists per category.
//! Aliases are listed in priority order and matched case-insensitively.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::columns::ColumnRole;
use crate::extract::records::RoleRow;
use crate::types::SourceMetadata;

pub type AliasTable = &'static [(ColumnRole, &'static [&'static str])];

/// Key holding vendor metadata that is copied into `source_metadata`
pub const METADATA_KEY: &str = "metadata";

const TIMESTAMP_ALIASES: &[&str] = &[
    "timestamp", "date", "time", "datetime", "date_sent", "sent_at", "created_at",
];

pub const CHAT_ALIASES: AliasTable = &[
    (ColumnRole::Content, &["message_content", "message", "text", "body", "content"]),
    (ColumnRole::AppName, &["app_name", "app", "application", "source_app", "service"]),
    (ColumnRole::Sender, &["sender_number", "sender", "from", "from_number", "author", "address"]),
    (ColumnRole::Receiver, &["receiver_number", "receiver", "to", "to_number", "recipient"]),
    (ColumnRole::Timestamp, TIMESTAMP_ALIASES),
    (ColumnRole::Kind, &["message_type", "msg_type", "type"]),
    (ColumnRole::Deleted, &["is_deleted", "deleted"]),
];

pub const CALL_ALIASES: AliasTable = &[
    (ColumnRole::Duration, &["duration", "duration_seconds", "call_duration"]),
    (ColumnRole::Sender, &["caller_number", "caller", "from", "from_number"]),
    (ColumnRole::Receiver, &["receiver_number", "receiver", "callee", "to", "to_number"]),
    (ColumnRole::Phone, &["number", "phone_number", "phone"]),
    (ColumnRole::Kind, &["call_type", "type", "direction"]),
    (ColumnRole::Timestamp, TIMESTAMP_ALIASES),
];

pub const CONTACT_ALIASES: AliasTable = &[
    (ColumnRole::Name, &["name", "display_name", "full_name", "contact_name"]),
    (
        ColumnRole::Phone,
        &["phone_numbers", "phones", "phone_number", "phone", "mobile", "numbers", "number"],
    ),
    (ColumnRole::Email, &["email_addresses", "emails", "email_address", "email"]),
];

pub const MEDIA_ALIASES: AliasTable = &[
    (ColumnRole::Filename, &["filename", "file_name"]),
    (ColumnRole::Path, &["file_path", "path", "local_path", "filepath"]),
    (ColumnRole::Mime, &["file_type", "mime_type", "mime", "content_type", "type"]),
    (ColumnRole::Size, &["file_size_bytes", "file_size", "size", "size_bytes"]),
    (ColumnRole::Created, &["created_at", "created_date", "created", "creation_time"]),
    (ColumnRole::Modified, &["modified_at", "modified_date", "modified", "last_modified"]),
    (ColumnRole::HashMd5, &["hash_md5", "md5"]),
    (ColumnRole::HashSha256, &["hash_sha256", "sha256"]),
];

/// Case-insensitive view of one JSON object's keys
///
/// When two keys differ only in case the first one in map order wins.
#[derive(Debug)]
pub struct KeyView<'a> {
    keys: BTreeMap<String, &'a Value>,
}

impl<'a> KeyView<'a> {
    pub fn new(object: &'a Map<String, Value>) -> Self {
        let mut keys = BTreeMap::new();
        for (key, value) in object {
            keys.entry(key.to_lowercase()).or_insert(value);
        }
        Self { keys }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.keys.get(key).copied()
    }

    /// First non-null value among `aliases`
    pub fn first(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|alias| self.get(alias))
            .find(|value| !value.is_null())
    }

    pub fn has_any(&self, aliases: &[&str]) -> bool {
        self.first(aliases).is_some()
    }

    /// Lowercased keys containing `needle`, in key order
    pub fn keys_containing<'s>(&'s self, needle: &'s str) -> impl Iterator<Item = (&'s str, &'a Value)> + 's {
        self.keys
            .iter()
            .filter(move |(key, _)| key.contains(needle))
            .map(|(key, value)| (key.as_str(), *value))
    }

    /// The object's own `metadata` map, if it carries one
    pub fn vendor_metadata(&self) -> SourceMetadata {
        match self.get(METADATA_KEY) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => SourceMetadata::new(),
        }
    }
}

/// Resolve an object into a role row through an alias table
pub fn role_row(view: &KeyView<'_>, aliases: AliasTable) -> RoleRow {
    let mut row = RoleRow::new().with_metadata(view.vendor_metadata());
    for (role, keys) in aliases {
        if let Some(value) = view.first(keys) {
            row.insert(*role, value.clone());
        }
    }
    row
}
