//! Normalized evidence types
//!
//! These are the only shapes the engine hands back to callers. Every record
//! carries `source_metadata["source"]` naming the artifact (table, file,
//! document section) that produced it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form provenance and vendor metadata attached to every record
pub type SourceMetadata = BTreeMap<String, Value>;

/// Metadata key naming the producing artifact
pub const SOURCE_KEY: &str = "source";
/// Metadata key naming the archive entry (or document) the record came from
pub const ARTIFACT_KEY: &str = "artifact";
/// Metadata key naming the extractor/pass that produced the record
pub const EXTRACTOR_KEY: &str = "extractor";

/// Container kind detected by signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// ZIP-like archive of artifacts
    Archive,
    /// Single structured document (JSON, or XML report)
    #[default]
    Document,
}

/// Device details; absent fields stay empty, never fabricated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
}

impl DeviceInfo {
    pub fn is_empty(&self) -> bool {
        self.manufacturer.is_none()
            && self.model.is_none()
            && self.imei.is_none()
            && self.os_version.is_none()
            && self.build_number.is_none()
    }

    /// Fill fields that are still empty from `other`
    pub fn merge_missing(&mut self, other: DeviceInfo) {
        if self.manufacturer.is_none() {
            self.manufacturer = other.manufacturer;
        }
        if self.model.is_none() {
            self.model = other.model;
        }
        if self.imei.is_none() {
            self.imei = other.imei;
        }
        if self.os_version.is_none() {
            self.os_version = other.os_version;
        }
        if self.build_number.is_none() {
            self.build_number = other.build_number;
        }
    }
}

/// Case details recovered from the manifest or document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examiner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CaseInfo {
    pub fn merge_missing(&mut self, other: CaseInfo) {
        if self.case_number.is_none() {
            self.case_number = other.case_number;
        }
        if self.examiner.is_none() {
            self.examiner = other.examiner;
        }
        if self.agency.is_none() {
            self.agency = other.agency;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
    }
}

/// One processed archive entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub path: String,
    pub kind: String,
    /// Records this artifact contributed before duplicate suppression
    pub records: usize,
}

/// Why an artifact, table or row was left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub artifact: String,
    /// Narrower scope inside the artifact (table/category, strategy), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub container_kind: ContainerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    pub case_info: CaseInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_tool: Option<String>,
    pub artifacts: Vec<ArtifactReport>,
    pub skipped: Vec<SkipRecord>,
    pub duplicates_suppressed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub app_name: String,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub message_type: String,
    pub is_deleted: bool,
    pub source_metadata: SourceMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub caller: Option<String>,
    pub receiver: Option<String>,
    pub call_type: String,
    pub duration_seconds: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub source_metadata: SourceMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub email_addresses: Vec<String>,
    pub source_metadata: SourceMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub filename: String,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub file_size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub hash_md5: Option<String>,
    pub hash_sha256: Option<String>,
    pub source_metadata: SourceMetadata,
}

/// Records produced by one extraction pass, before aggregation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub chat_records: Vec<ChatRecord>,
    pub call_records: Vec<CallRecord>,
    pub contacts: Vec<Contact>,
    pub media_files: Vec<MediaFile>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.chat_records.len() + self.call_records.len() + self.contacts.len() + self.media_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(&mut self, mut other: RecordBatch) {
        self.chat_records.append(&mut other.chat_records);
        self.call_records.append(&mut other.call_records);
        self.contacts.append(&mut other.contacts);
        self.media_files.append(&mut other.media_files);
    }
}

/// The engine's sole output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvidenceSet {
    pub device_info: DeviceInfo,
    pub metadata: ExtractionMetadata,
    pub chat_records: Vec<ChatRecord>,
    pub call_records: Vec<CallRecord>,
    pub contacts: Vec<Contact>,
    pub media_files: Vec<MediaFile>,
}

impl NormalizedEvidenceSet {
    pub fn total_records(&self) -> usize {
        self.chat_records.len() + self.call_records.len() + self.contacts.len() + self.media_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }

    pub(crate) fn absorb(&mut self, batch: RecordBatch) {
        let RecordBatch { mut chat_records, mut call_records, mut contacts, mut media_files } = batch;
        self.chat_records.append(&mut chat_records);
        self.call_records.append(&mut call_records);
        self.contacts.append(&mut contacts);
        self.media_files.append(&mut media_files);
    }

    pub(crate) fn skip(&mut self, artifact: &str, scope: Option<String>, reason: impl ToString) {
        self.metadata.skipped.push(SkipRecord {
            artifact: artifact.to_string(),
            scope,
            reason: reason.to_string(),
        });
    }
}

/// Where a record came from, turned into `source_metadata` by the builders
#[derive(Debug, Clone)]
pub struct Provenance {
    pub artifact: String,
    pub source: String,
    pub extractor: &'static str,
    /// Extra context such as manifest section or original device path
    pub extras: SourceMetadata,
}

impl Provenance {
    pub fn new(artifact: &str, source: &str, extractor: &'static str) -> Self {
        Self {
            artifact: artifact.to_string(),
            source: source.to_string(),
            extractor,
            extras: SourceMetadata::new(),
        }
    }

    pub fn with_extras(mut self, extras: SourceMetadata) -> Self {
        self.extras = extras;
        self
    }

    /// Same artifact and extras under a different source label
    pub fn for_source(&self, source: &str) -> Self {
        Self {
            artifact: self.artifact.clone(),
            source: source.to_string(),
            extractor: self.extractor,
            extras: self.extras.clone(),
        }
    }

    /// Build record metadata on top of any vendor metadata already present
    pub fn stamp(&self, mut base: SourceMetadata) -> SourceMetadata {
        for (key, value) in &self.extras {
            base.entry(key.clone()).or_insert_with(|| value.clone());
        }
        base.insert(SOURCE_KEY.to_string(), Value::String(self.source.clone()));
        base.insert(ARTIFACT_KEY.to_string(), Value::String(self.artifact.clone()));
        base.insert(EXTRACTOR_KEY.to_string(), Value::String(self.extractor.to_string()));
        base
    }
}
