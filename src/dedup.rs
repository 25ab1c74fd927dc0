//! Cross-pass duplicate suppression
//!
//! Several passes can read the same data: the known-key mapping and the
//! recursive walk over one document, or a parent node and its child. A
//! record is dropped when an earlier kept record with the same content key
//! came from a different pass. Records of one pass are never collapsed, so
//! a table that genuinely repeats a row keeps both rows.
//!
//! ```text
//! pass = artifact + extractor + source (+ node path for the recursive walk)
//! chat    = content + sender + receiver + timestamp
//! call    = caller + receiver + timestamp + duration
//! contact = name + sorted phones + sorted emails
//! media   = filename + path + size + hashes
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::classify::recursive::{NODE_PATH_KEY, RECURSIVE_EXTRACTOR};
use crate::types::{
    CallRecord, ChatRecord, Contact, MediaFile, NormalizedEvidenceSet, SourceMetadata, ARTIFACT_KEY,
    EXTRACTOR_KEY, SOURCE_KEY,
};

const SEPARATOR: char = '\u{1f}';

/// Drop cross-pass duplicates in place and return how many were removed
pub fn suppress_cross_pass_duplicates(set: &mut NormalizedEvidenceSet) -> usize {
    let chats = retain_first(&mut set.chat_records, |r| &r.source_metadata, chat_key);
    let calls = retain_first(&mut set.call_records, |r| &r.source_metadata, call_key);
    let contacts = retain_first(&mut set.contacts, |r| &r.source_metadata, contact_key);
    let media = retain_first(&mut set.media_files, |r| &r.source_metadata, media_key);

    let removed = chats + calls + contacts + media;
    if removed > 0 {
        debug!(
            "Suppressed {} duplicates (chats={}, calls={}, contacts={}, media={})",
            removed, chats, calls, contacts, media
        );
    }
    removed
}

fn retain_first<T>(
    records: &mut Vec<T>,
    metadata: impl Fn(&T) -> &SourceMetadata,
    key: impl Fn(&T) -> String,
) -> usize {
    let before = records.len();
    let mut seen: HashMap<String, HashSet<String>> = HashMap::new();

    records.retain(|record| {
        let pass = pass_of(metadata(record));
        let passes = seen.entry(key(record)).or_default();
        if passes.iter().any(|p| p != &pass) {
            return false;
        }
        passes.insert(pass);
        true
    });

    before - records.len()
}

fn pass_of(metadata: &SourceMetadata) -> String {
    let extractor = meta_str(metadata, EXTRACTOR_KEY);
    let mut parts = vec![meta_str(metadata, ARTIFACT_KEY), extractor, meta_str(metadata, SOURCE_KEY)];
    // each node of a recursive walk is its own pass
    if extractor == RECURSIVE_EXTRACTOR {
        parts.push(meta_str(metadata, NODE_PATH_KEY));
    }
    join(&parts)
}

fn meta_str<'a>(metadata: &'a SourceMetadata, key: &str) -> &'a str {
    metadata.get(key).and_then(Value::as_str).unwrap_or("")
}

fn join(parts: &[&str]) -> String {
    parts.join(&SEPARATOR.to_string())
}

fn ts(value: &Option<DateTime<Utc>>) -> String {
    value.map(|t| t.timestamp_millis().to_string()).unwrap_or_default()
}

fn chat_key(r: &ChatRecord) -> String {
    join(&[
        &r.content,
        r.sender.as_deref().unwrap_or(""),
        r.receiver.as_deref().unwrap_or(""),
        &ts(&r.timestamp),
    ])
}

fn call_key(r: &CallRecord) -> String {
    join(&[
        r.caller.as_deref().unwrap_or(""),
        r.receiver.as_deref().unwrap_or(""),
        &ts(&r.timestamp),
        &r.duration_seconds.to_string(),
    ])
}

fn contact_key(r: &Contact) -> String {
    let mut phones = r.phone_numbers.clone();
    phones.sort();
    let mut emails: Vec<String> = r.email_addresses.iter().map(|e| e.to_lowercase()).collect();
    emails.sort();
    join(&[&r.name, &phones.join(","), &emails.join(",")])
}

fn media_key(r: &MediaFile) -> String {
    join(&[
        &r.filename,
        r.file_path.as_deref().unwrap_or(""),
        &r.file_size_bytes.to_string(),
        r.hash_md5.as_deref().unwrap_or(""),
        r.hash_sha256.as_deref().unwrap_or(""),
    ])
}
