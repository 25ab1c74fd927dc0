//! Container and entry type detection
//!
//! Signatures win over names: a `.db` entry without the SQLite header is
//! still tried as SQLite (some tools strip nothing but rename freely), but
//! an unnamed entry with the header is always SQLite.

use crate::common::magic::{self, FileType};
use crate::extract::relational::{has_sqlite_signature, SQLITE_EXTENSIONS};
use crate::extract::tabular::delimiter_for_extension;
use crate::extract::ufd::UFD_EXTENSION;
use crate::types::ContainerKind;

/// ZIP local file header
const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
/// ZIP end-of-central-directory (empty archive)
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";

/// Bytes read from each entry before deciding what it is
pub const HEADER_PEEK: usize = 64;

/// Archive when the bytes carry a ZIP signature, otherwise a document
pub fn detect_container_kind(bytes: &[u8]) -> ContainerKind {
    if bytes.starts_with(ZIP_LOCAL_HEADER) || bytes.starts_with(ZIP_EMPTY_ARCHIVE) {
        ContainerKind::Archive
    } else {
        ContainerKind::Document
    }
}

/// Whether a declared extension names the supported container type
///
/// Accepts ".ufdr" or "ufdr" in any case, or a whole file name ending in it.
pub fn is_supported_extension(declared: &str) -> bool {
    let ext = super::UFDR_EXTENSION.trim_start_matches('.');
    let declared = declared.trim().to_lowercase();
    let declared = declared.rsplit('.').next().unwrap_or("");
    declared == ext
}

/// What an archive entry is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Relational,
    Delimited(u8),
    Json,
    Xml,
    Ufd,
    Media(FileType),
    /// Not an artifact the engine reads
    Other,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Relational => "sqlite",
            EntryKind::Delimited(b'\t') => "tsv",
            EntryKind::Delimited(_) => "csv",
            EntryKind::Json => "json",
            EntryKind::Xml => "xml",
            EntryKind::Ufd => "ufd",
            EntryKind::Media(_) => "media",
            EntryKind::Other => "other",
        }
    }
}

/// Lowercase extension of an entry name, without the dot
pub fn extension_of(name: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Classify an entry from its name and first bytes
pub fn classify_entry(name: &str, header: &[u8]) -> EntryKind {
    if has_sqlite_signature(header) {
        return EntryKind::Relational;
    }

    let ext = extension_of(name);
    if SQLITE_EXTENSIONS.contains(&ext.as_str()) {
        return EntryKind::Relational;
    }
    if let Some(delimiter) = delimiter_for_extension(&ext) {
        return EntryKind::Delimited(delimiter);
    }
    match ext.as_str() {
        "json" | "jsonl" | "ndjson" => return EntryKind::Json,
        "xml" => return EntryKind::Xml,
        e if e == UFD_EXTENSION => return EntryKind::Ufd,
        _ => {}
    }

    match magic::detect(header, &ext) {
        Some(file_type) if file_type.category.is_media() => EntryKind::Media(file_type),
        _ => EntryKind::Other,
    }
}
