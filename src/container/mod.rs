//! Container dispatcher
//!
//! Entry point of the engine. A container is either a ZIP-like archive of
//! artifacts or a single structured document; the kind comes from the
//! content signature, never from the extension.
//!
//! ```text
//! extract(bytes, ".ufdr")
//!   ├── archive   manifest (advisory) ─┐
//!   │             entries ─────────────┼─► relational / tabular / structured
//!   │                                  │   xml_report / ufd / media
//!   └── document  known keys ─► recursive walk
//!                                      │
//!                         duplicate suppression ─► NormalizedEvidenceSet
//! ```
//!
//! The only error returned is a wrong declared extension. Every failure
//! inside an artifact becomes a [`SkipRecord`](crate::types::SkipRecord) and
//! extraction moves on to the next artifact.
//!
//! ## Module Structure
//! ```text
//! container/
//! ├── mod.rs        - Extractor, archive and document paths
//! ├── detection.rs  - Container kind, entry kind
//! └── strategy.rs   - Ordered extraction strategies
//! ```

pub mod detection;
pub mod strategy;

pub use detection::{classify_entry, detect_container_kind, is_supported_extension, EntryKind};
pub use strategy::{ExtractionStrategy, StrategyChain};

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use tracing::{debug, info, instrument, trace, warn};
use zip::ZipArchive;

use crate::config::EngineConfig;
use crate::dedup::suppress_cross_pass_duplicates;
use crate::error::{ArtifactError, ExtractError, ExtractResult};
use crate::extract::media::{catalog_entry, MEDIA_EXTRACTOR};
use crate::extract::relational::{extract_database, RELATIONAL_EXTRACTOR};
use crate::extract::structured::{
    document_case_info, document_device_info, extract_json_entry, extract_single_document, parse_document,
    KNOWN_KEYS_EXTRACTOR, TABULAR_JSON_EXTRACTOR,
};
use crate::extract::tabular::{extract_delimited, TABULAR_EXTRACTOR};
use crate::extract::ufd::{parse_ufd, UfdSummary};
use crate::extract::xml_report::{extract_xml_report, XmlReport, XML_EXTRACTOR};
use crate::extract::ArtifactOutcome;
use crate::manifest::{parse_manifest, select_manifest, Manifest};
use crate::types::{ArtifactReport, ContainerKind, NormalizedEvidenceSet, Provenance, RecordBatch};

/// The supported evidence container extension
pub const UFDR_EXTENSION: &str = ".ufdr";

/// Artifact label for a single-document container
pub const DOCUMENT_ARTIFACT: &str = "<document>";

/// Artifact label for failures of the archive as a whole
pub const ARCHIVE_ARTIFACT: &str = "<archive>";

// =============================================================================
// Public API
// =============================================================================

/// Extract a container with the default configuration
pub fn extract(container: &[u8], declared_extension: &str) -> ExtractResult<NormalizedEvidenceSet> {
    Extractor::default().extract(container, declared_extension)
}

/// Read a container from disk; the declared extension is the file's own
pub fn extract_path(path: &Path, config: EngineConfig) -> ExtractResult<NormalizedEvidenceSet> {
    let declared = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    if !is_supported_extension(&declared) {
        return Err(ExtractError::UnsupportedContainer { declared });
    }

    let bytes = std::fs::read(path)?;
    Extractor::new(config).extract(&bytes, &declared)
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: EngineConfig,
}

impl Extractor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one extraction pass over a container
    #[instrument(skip(self, container), fields(bytes = container.len()))]
    pub fn extract(&self, container: &[u8], declared_extension: &str) -> ExtractResult<NormalizedEvidenceSet> {
        if !is_supported_extension(declared_extension) {
            return Err(ExtractError::UnsupportedContainer {
                declared: declared_extension.to_string(),
            });
        }

        let mut set = NormalizedEvidenceSet::default();
        let kind = detect_container_kind(container);
        set.metadata.container_kind = kind;
        debug!("Container kind: {:?}", kind);

        match kind {
            ContainerKind::Archive => self.extract_archive(container, &mut set),
            ContainerKind::Document => self.extract_document(container, &mut set),
        }

        if !self.config.allow_duplicate_classification {
            set.metadata.duplicates_suppressed = suppress_cross_pass_duplicates(&mut set);
        }

        info!(
            chats = set.chat_records.len(),
            calls = set.call_records.len(),
            contacts = set.contacts.len(),
            media = set.media_files.len(),
            skipped = set.metadata.skipped.len(),
            "Extraction complete"
        );
        Ok(set)
    }

    // =========================================================================
    // Archive path
    // =========================================================================

    fn extract_archive(&self, bytes: &[u8], set: &mut NormalizedEvidenceSet) {
        let mut archive = match ZipArchive::new(Cursor::new(bytes)) {
            Ok(archive) => archive,
            Err(e) => {
                warn!("Container has an archive signature but cannot be opened: {}", e);
                set.skip(ARCHIVE_ARTIFACT, None, ArtifactError::from(e));
                return;
            }
        };

        let entries = list_entries(&mut archive);
        let names: Vec<&str> = entries.iter().filter(|e| !e.is_dir).map(|e| e.name.as_str()).collect();
        let manifest_name = select_manifest(&names).map(str::to_string);
        debug!("{} archive entries, manifest: {:?}", entries.len(), manifest_name);

        let manifest = match manifest_name.as_deref().and_then(|name| entries.iter().find(|e| e.name == name)) {
            Some(info) => self.load_manifest(&mut archive, info, set),
            None => Manifest::default(),
        };

        let mut ufd_summaries: Vec<UfdSummary> = Vec::new();
        for info in &entries {
            if info.is_dir || manifest_name.as_deref() == Some(info.name.as_str()) {
                continue;
            }

            let (kind, content) = match read_artifact(&mut archive, info, &self.config) {
                Ok(Some(read)) => read,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {}: {}", info.name, e);
                    set.skip(&info.name, None, e);
                    continue;
                }
            };

            match self.dispatch(&info.name, &kind, &content, &manifest, set, &mut ufd_summaries) {
                Ok(outcome) => {
                    debug!("{} ({}): {} records", info.name, kind.label(), outcome.batch.len());
                    set.metadata.artifacts.push(ArtifactReport {
                        path: info.name.clone(),
                        kind: kind.label().to_string(),
                        records: outcome.batch.len(),
                    });
                    set.metadata.skipped.extend(outcome.skipped);
                    set.absorb(outcome.batch);
                }
                Err(e) => {
                    warn!("Skipping {} ({}): {}", info.name, kind.label(), e);
                    set.skip(&info.name, Some(kind.label().to_string()), e);
                }
            }
        }

        // Summaries only fill what the manifest left empty
        for summary in ufd_summaries {
            set.device_info.merge_missing(summary.device_info);
            set.metadata.case_info.merge_missing(summary.case_info);
            if set.metadata.extraction_tool.is_none() {
                set.metadata.extraction_tool = summary.extraction_tool;
            }
            if set.metadata.extraction_date.is_none() {
                set.metadata.extraction_date = summary.extraction_date;
            }
        }
    }

    fn load_manifest<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        info: &EntryInfo,
        set: &mut NormalizedEvidenceSet,
    ) -> Manifest {
        set.metadata.manifest_path = Some(info.name.clone());

        let content = match read_artifact(archive, info, &self.config) {
            Ok(Some((_, content))) => content,
            Ok(None) => return Manifest::default(),
            Err(e) => {
                warn!("Manifest {} unreadable, continuing without it: {}", info.name, e);
                set.skip(&info.name, Some("manifest".to_string()), e);
                return Manifest::default();
            }
        };

        let manifest = parse_manifest(&content);
        if let Some(err) = &manifest.parse_error {
            set.skip(&info.name, Some("manifest".to_string()), err);
        }
        debug!("Manifest {}: {} entries", info.name, manifest.len());

        set.device_info.merge_missing(manifest.device_info.clone());
        set.metadata.case_info.merge_missing(manifest.case_info.clone());
        set.metadata.extraction_date = set.metadata.extraction_date.or(manifest.extraction_date);
        if set.metadata.extraction_tool.is_none() {
            set.metadata.extraction_tool = manifest.extraction_tool.clone();
        }

        // An XML file with no artifact entries may be the evidence itself
        if manifest.is_empty() {
            let prov = Provenance::new(&info.name, &info.name, XML_EXTRACTOR);
            match extract_xml_report(&content, &prov, &self.config) {
                Ok(report) => {
                    let batch = apply_xml_report(set, &info.name, report, &self.config);
                    set.metadata.artifacts.push(ArtifactReport {
                        path: info.name.clone(),
                        kind: "xml".to_string(),
                        records: batch.len(),
                    });
                    set.absorb(batch);
                }
                Err(e) => debug!("{}: not an XML report: {}", info.name, e),
            }
        }

        manifest
    }

    fn dispatch(
        &self,
        name: &str,
        kind: &EntryKind,
        content: &[u8],
        manifest: &Manifest,
        set: &mut NormalizedEvidenceSet,
        ufd_summaries: &mut Vec<UfdSummary>,
    ) -> Result<ArtifactOutcome, ArtifactError> {
        let prov = |source: &str, extractor: &'static str| {
            Provenance::new(name, source, extractor).with_extras(manifest.context_for(name))
        };

        match kind {
            EntryKind::Relational => extract_database(content, &prov(name, RELATIONAL_EXTRACTOR), &self.config),
            EntryKind::Delimited(delimiter) => {
                extract_delimited(content, *delimiter, &prov(table_name(name), TABULAR_EXTRACTOR), &self.config)
            }
            EntryKind::Json => extract_json_entry(content, &prov(name, TABULAR_JSON_EXTRACTOR), &self.config),
            EntryKind::Xml => {
                let report = extract_xml_report(content, &prov(name, XML_EXTRACTOR), &self.config)?;
                let batch = apply_xml_report(set, name, report, &self.config);
                Ok(ArtifactOutcome::from_batch(batch))
            }
            EntryKind::Ufd => {
                ufd_summaries.push(parse_ufd(content));
                Ok(ArtifactOutcome::default())
            }
            EntryKind::Media(file_type) => {
                let media = catalog_entry(name, content, file_type, &prov(name, MEDIA_EXTRACTOR));
                Ok(ArtifactOutcome::from_batch(RecordBatch {
                    media_files: vec![media],
                    ..Default::default()
                }))
            }
            EntryKind::Other => Ok(ArtifactOutcome::default()),
        }
    }

    // =========================================================================
    // Document path
    // =========================================================================

    fn extract_document(&self, bytes: &[u8], set: &mut NormalizedEvidenceSet) {
        let first = bytes
            .strip_prefix(b"\xEF\xBB\xBF".as_slice())
            .unwrap_or(bytes)
            .iter()
            .find(|b| !b.is_ascii_whitespace());

        if first == Some(&b'<') {
            let prov = Provenance::new(DOCUMENT_ARTIFACT, DOCUMENT_ARTIFACT, XML_EXTRACTOR);
            match extract_xml_report(bytes, &prov, &self.config) {
                Ok(report) => {
                    let batch = apply_xml_report(set, DOCUMENT_ARTIFACT, report, &self.config);
                    set.absorb(batch);
                }
                Err(e) => {
                    warn!("Document is not readable XML: {}", e);
                    set.skip(DOCUMENT_ARTIFACT, None, e);
                }
            }
            return;
        }

        let doc = match parse_document(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Document is not a structured document: {}", e);
                set.skip(DOCUMENT_ARTIFACT, None, e);
                return;
            }
        };

        set.device_info = document_device_info(&doc);
        let (case_info, extraction_date) = document_case_info(&doc);
        set.metadata.case_info = case_info;
        set.metadata.extraction_date = extraction_date;

        let prov = Provenance::new(DOCUMENT_ARTIFACT, DOCUMENT_ARTIFACT, KNOWN_KEYS_EXTRACTOR);
        let outcome = extract_single_document(&doc, &prov, &self.config);
        set.metadata.skipped.extend(outcome.skipped);
        set.absorb(outcome.batch);
    }
}

// =============================================================================
// Archive helpers
// =============================================================================

#[derive(Debug, Clone)]
struct EntryInfo {
    index: usize,
    name: String,
    is_dir: bool,
    size: u64,
}

/// Central directory listing; raw access so encrypted entries still list
fn list_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Vec<EntryInfo> {
    (0..archive.len())
        .filter_map(|index| match archive.by_index_raw(index) {
            Ok(entry) => Some(EntryInfo {
                index,
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                size: entry.size(),
            }),
            Err(e) => {
                warn!("Archive entry {} unreadable: {}", index, e);
                None
            }
        })
        .collect()
}

/// Read an entry the engine can use; `None` for entries it ignores
///
/// Only the first bytes are read before deciding, so large unrelated
/// entries are never decompressed in full.
fn read_artifact<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    info: &EntryInfo,
    config: &EngineConfig,
) -> Result<Option<(EntryKind, Vec<u8>)>, ArtifactError> {
    let limit = config.max_entry_bytes;
    if info.size > limit {
        return Err(ArtifactError::TooLarge { size: info.size, limit });
    }

    let mut entry = archive.by_index(info.index)?;
    let mut content = Vec::new();
    (&mut entry).take(detection::HEADER_PEEK as u64).read_to_end(&mut content)?;

    let kind = classify_entry(&info.name, &content);
    let wanted = match &kind {
        EntryKind::Other => false,
        EntryKind::Media(_) => config.catalog_embedded_media,
        _ => true,
    };
    if !wanted {
        trace!("Ignoring {} ({})", info.name, kind.label());
        return Ok(None);
    }

    // Declared sizes can lie; never read past the limit
    let remaining = limit.saturating_add(1).saturating_sub(content.len() as u64);
    entry.take(remaining).read_to_end(&mut content)?;
    if content.len() as u64 > limit {
        return Err(ArtifactError::TooLarge {
            size: content.len() as u64,
            limit,
        });
    }

    Ok(Some((kind, content)))
}

/// Source label for a delimited file: its name without directory or extension
fn table_name(entry_name: &str) -> &str {
    let file = entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// Fold XML report metadata into the set and hand back its records
fn apply_xml_report(
    set: &mut NormalizedEvidenceSet,
    artifact: &str,
    report: XmlReport,
    config: &EngineConfig,
) -> RecordBatch {
    set.device_info.merge_missing(report.device_info);
    set.metadata.case_info.merge_missing(report.case_info);
    set.metadata.extraction_date = set.metadata.extraction_date.or(report.extraction_date);
    if report.truncated_nodes > 0 {
        set.skip(
            artifact,
            Some(XML_EXTRACTOR.to_string()),
            format!("{} elements beyond depth {}", report.truncated_nodes, config.max_depth),
        );
    }
    report.batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sqlite_bytes, zip_bytes};

    fn sms_db() -> Vec<u8> {
        sqlite_bytes(
            "CREATE TABLE sms (address TEXT, body TEXT, date INTEGER);
             INSERT INTO sms VALUES ('+15551230001', 'first', 1700000000000);
             INSERT INTO sms VALUES ('+15551230002', 'second', 1700000060000);
             INSERT INTO sms VALUES ('+15551230003', 'third', 1700000120000);",
        )
    }

    const CALLS_DOC: &str =
        r#"{"calls":[{"caller":"+1555","receiver":"+1556","duration":45,"timestamp":1700000000}]}"#;

    #[test]
    fn test_rejects_wrong_extension() {
        let err = extract(CALLS_DOC.as_bytes(), ".zip").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContainer { ref declared } if declared == ".zip"));
        assert!(extract(CALLS_DOC.as_bytes(), "UFDR").is_ok());
    }

    #[test]
    fn test_archive_sms_table() {
        let db = sms_db();
        let container = zip_bytes(&[("databases/mmssms.db", db.as_slice())]);

        let set = extract(&container, ".ufdr").unwrap();
        assert_eq!(set.metadata.container_kind, ContainerKind::Archive);
        assert_eq!(set.chat_records.len(), 3);
        for chat in &set.chat_records {
            assert!(chat.sender.is_some());
            assert!(chat.receiver.is_none());
            assert!(chat.timestamp.is_some());
            assert_eq!(chat.app_name, "Unknown");
            assert_eq!(chat.source_metadata["source"], "sms");
        }
        assert_eq!(set.chat_records[0].content, "first");
        assert_eq!(set.metadata.artifacts.len(), 1);
        assert_eq!(set.metadata.artifacts[0].records, 3);
    }

    #[test]
    fn test_single_document_calls() {
        let set = extract(CALLS_DOC.as_bytes(), ".ufdr").unwrap();
        assert_eq!(set.metadata.container_kind, ContainerKind::Document);
        assert_eq!(set.call_records.len(), 1);
        let call = &set.call_records[0];
        assert_eq!(call.duration_seconds, 45);
        assert_eq!(call.caller.as_deref(), Some("+1555"));
        assert_eq!(call.timestamp.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(call.source_metadata["extractor"], "known_keys");
        assert_eq!(set.metadata.duplicates_suppressed, 1);
    }

    #[test]
    fn test_duplicates_kept_when_allowed() {
        let config = EngineConfig {
            allow_duplicate_classification: true,
            ..Default::default()
        };
        let set = Extractor::new(config).extract(CALLS_DOC.as_bytes(), ".ufdr").unwrap();
        assert_eq!(set.call_records.len(), 2);
        assert_eq!(set.metadata.duplicates_suppressed, 0);
    }

    #[test]
    fn test_nested_copy_of_chat_suppressed() {
        let doc = r#"{"message":"hi","sender":"a","timestamp":1700000000,
                      "forwarded":{"message":"hi","sender":"a","timestamp":1700000000}}"#;

        let set = extract(doc.as_bytes(), ".ufdr").unwrap();
        assert_eq!(set.chat_records.len(), 1);
        assert_eq!(set.chat_records[0].source_metadata["node_path"], "");
        assert_eq!(set.metadata.duplicates_suppressed, 1);

        let config = EngineConfig {
            allow_duplicate_classification: true,
            ..Default::default()
        };
        let set = Extractor::new(config).extract(doc.as_bytes(), ".ufdr").unwrap();
        assert_eq!(set.chat_records.len(), 2);
    }

    #[test]
    fn test_corrupt_database_is_contained() {
        let mut corrupt = b"SQLite format 3\0".to_vec();
        corrupt.extend_from_slice(&[0xAB; 200]);
        let db = sms_db();
        let container = zip_bytes(&[("databases/broken.db", corrupt.as_slice()), ("databases/mmssms.db", db.as_slice())]);

        let set = extract(&container, ".ufdr").unwrap();
        assert_eq!(set.chat_records.len(), 3);
        assert!(set.metadata.skipped.iter().any(|s| s.artifact == "databases/broken.db"));
    }

    #[test]
    fn test_nested_chat_in_document() {
        let doc = r#"{"export": {"payload": {"envelope": {"message": "see you at 5", "sender": "bob"}}}}"#;
        let set = extract(doc.as_bytes(), ".ufdr").unwrap();
        assert_eq!(set.chat_records.len(), 1);
        assert_eq!(set.chat_records[0].content, "see you at 5");
        assert_eq!(set.chat_records[0].sender.as_deref(), Some("bob"));
    }

    #[test]
    fn test_unrecognized_documents_are_empty() {
        let set = extract(br#"{"settings": {"theme": "dark", "volume": 3}}"#, ".ufdr").unwrap();
        assert!(set.is_empty());
        assert!(set.metadata.skipped.is_empty());

        let set = extract(b"", ".ufdr").unwrap();
        assert!(set.is_empty());
        assert_eq!(set.metadata.skipped.len(), 1);

        let set = extract(b"\x00\x01binary junk", ".ufdr").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let db = sms_db();
        let container = zip_bytes(&[
            ("databases/mmssms.db", db.as_slice()),
            ("export/calls.json", CALLS_DOC.as_bytes()),
            ("export/contacts.csv", b"name,phone\nAlice,+1 555 000 1111\n".as_slice()),
        ]);
        let first = extract(&container, ".ufdr").unwrap();
        let second = extract(&container, ".ufdr").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.contacts.len(), 1);
        assert_eq!(first.contacts[0].source_metadata["source"], "contacts");
        assert_eq!(first.call_records.len(), 1);
    }

    #[test]
    fn test_manifest_context_and_device() {
        let manifest = r#"<?xml version="1.0"?>
<project>
  <metadata section="Device Info">
    <item name="DeviceInfoSelectedManufacturer">Samsung</item>
    <item name="DeviceInfoDetectedModel">SM-G991B</item>
  </metadata>
  <taggedFiles>
    <file id="f-9" path="/data/data/com.android.providers.telephony/databases/mmssms.db" category="SMS">
      <metadata section="File">
        <item name="Local Path">databases\mmssms.db</item>
      </metadata>
    </file>
  </taggedFiles>
</project>"#;
        let ufd = b"[DeviceInfo]\nModel=Ignored\nIMEI1=356938035643809\n[General]\nAcquisitionTool=UFED 4PC\nVersion=7.60\n";
        let db = sms_db();
        let container = zip_bytes(&[
            ("report.xml", manifest.as_bytes()),
            ("databases/mmssms.db", db.as_slice()),
            ("Samsung.ufd", ufd.as_slice()),
        ]);

        let set = extract(&container, ".ufdr").unwrap();
        assert_eq!(set.metadata.manifest_path.as_deref(), Some("report.xml"));
        assert_eq!(set.device_info.model.as_deref(), Some("SM-G991B"));
        assert_eq!(set.device_info.manufacturer.as_deref(), Some("Samsung"));
        assert_eq!(set.device_info.imei.as_deref(), Some("356938035643809"));
        assert_eq!(set.metadata.extraction_tool.as_deref(), Some("UFED 4PC 7.60"));

        assert_eq!(set.chat_records.len(), 3);
        let meta = &set.chat_records[0].source_metadata;
        assert_eq!(meta["source"], "sms");
        assert_eq!(meta["manifest_id"], "f-9");
        assert_eq!(
            meta["device_path"],
            "/data/data/com.android.providers.telephony/databases/mmssms.db"
        );
    }

    const TAGGED_MANIFEST: &str = r#"<project><taggedFiles><file id="f-1" path="/sdcard/DCIM/a.jpg"/></taggedFiles></project>"#;

    #[test]
    fn test_xml_report_entry_beside_manifest() {
        let report = r#"<report><case number="C-7"/><message sender="+1 555 123 4567" timestamp="1700000000">on my way</message></report>"#;
        let container = zip_bytes(&[
            ("report.xml", TAGGED_MANIFEST.as_bytes()),
            ("export/messages.xml", report.as_bytes()),
        ]);

        let set = extract(&container, ".ufdr").unwrap();
        assert_eq!(set.metadata.manifest_path.as_deref(), Some("report.xml"));
        assert_eq!(set.chat_records.len(), 1);
        assert_eq!(set.chat_records[0].sender.as_deref(), Some("+15551234567"));
        assert_eq!(set.chat_records[0].source_metadata["artifact"], "export/messages.xml");
        assert_eq!(set.metadata.case_info.case_number.as_deref(), Some("C-7"));
        let artifact = &set.metadata.artifacts[0];
        assert_eq!((artifact.path.as_str(), artifact.kind.as_str(), artifact.records), ("export/messages.xml", "xml", 1));
    }

    #[test]
    fn test_manifest_without_entries_is_read_as_report() {
        let summary = r#"<report><device model="Pixel 7"/><message sender="+1 555 123 4567">hello</message></report>"#;
        let db = sms_db();
        let container = zip_bytes(&[
            ("meta/summary.xml", summary.as_bytes()),
            ("databases/mmssms.db", db.as_slice()),
        ]);

        let set = extract(&container, ".ufdr").unwrap();
        assert_eq!(set.metadata.manifest_path.as_deref(), Some("meta/summary.xml"));
        assert_eq!(set.device_info.model.as_deref(), Some("Pixel 7"));
        assert_eq!(set.chat_records.len(), 4);
        let from_summary: Vec<_> = set
            .chat_records
            .iter()
            .filter(|c| c.source_metadata["artifact"] == "meta/summary.xml")
            .collect();
        assert_eq!(from_summary.len(), 1);
        assert_eq!(from_summary[0].content, "hello");
        assert!(set.metadata.artifacts.iter().any(|a| a.path == "meta/summary.xml" && a.kind == "xml"));
    }

    #[test]
    fn test_deep_xml_entry_records_truncation() {
        let deep = r#"<a><b><c><message sender="+15551234567">deep</message></c></b></a>"#;
        let container = zip_bytes(&[
            ("report.xml", TAGGED_MANIFEST.as_bytes()),
            ("export/deep.xml", deep.as_bytes()),
        ]);
        let config = EngineConfig {
            max_depth: 2,
            ..Default::default()
        };

        let set = Extractor::new(config).extract(&container, ".ufdr").unwrap();
        assert!(set.chat_records.is_empty());
        let skip = set
            .metadata
            .skipped
            .iter()
            .find(|s| s.artifact == "export/deep.xml")
            .unwrap();
        assert_eq!(skip.scope.as_deref(), Some("xml_report"));
        assert_eq!(skip.reason, "2 elements beyond depth 2");
    }

    #[test]
    fn test_entry_size_limit() {
        let db = sms_db();
        let container = zip_bytes(&[("databases/mmssms.db", db.as_slice())]);
        let config = EngineConfig {
            max_entry_bytes: 16,
            ..Default::default()
        };
        let set = Extractor::new(config).extract(&container, ".ufdr").unwrap();
        assert!(set.chat_records.is_empty());
        assert!(set.metadata.skipped[0].reason.contains("limit"));
    }

    #[test]
    fn test_media_catalog_opt_in() {
        let jpeg: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
        let container = zip_bytes(&[("files/Image/IMG_0001.jpg", jpeg)]);

        let set = extract(&container, ".ufdr").unwrap();
        assert!(set.media_files.is_empty());

        let config = EngineConfig {
            catalog_embedded_media: true,
            ..Default::default()
        };
        let set = Extractor::new(config).extract(&container, ".ufdr").unwrap();
        assert_eq!(set.media_files.len(), 1);
        assert_eq!(set.media_files[0].filename, "IMG_0001.jpg");
        assert_eq!(set.media_files[0].file_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_xml_document_container() {
        let xml = r#"<report><device model="Pixel 7"/><messages><message from="+1 555 123 4567" to="me" timestamp="1700000000">hi there</message></messages></report>"#;
        let set = extract(xml.as_bytes(), ".ufdr").unwrap();
        assert_eq!(set.device_info.model.as_deref(), Some("Pixel 7"));
        assert_eq!(set.chat_records.len(), 1);
        assert_eq!(set.chat_records[0].content, "hi there");
    }

    #[test]
    fn test_extract_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.ufdr");
        std::fs::write(&path, CALLS_DOC).unwrap();
        let set = extract_path(&path, EngineConfig::default()).unwrap();
        assert_eq!(set.call_records.len(), 1);

        let wrong = dir.path().join("evidence.zip");
        std::fs::write(&wrong, CALLS_DOC).unwrap();
        assert!(matches!(
            extract_path(&wrong, EngineConfig::default()),
            Err(ExtractError::UnsupportedContainer { .. })
        ));
    }
}
