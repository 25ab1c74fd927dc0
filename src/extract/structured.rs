//! Structured (JSON) document extraction
//!
//! ```text
//! bytes ──► parse_document (whole JSON, then JSON Lines)
//!             │
//!             ▼
//!      StrategyChain: tabular ─fail─► known_keys ─fail─► recursive
//! ```
//!
//! Inside an archive the chain stops at the first strategy that produces
//! records. A single-document container instead runs the known-key mapping
//! and always follows it with the recursive walk; overlaps between the two
//! are handled by duplicate suppression.

use serde_json::{Map, Value};
use tracing::debug;

use super::records::{batch_from_table, build_call, build_chat, build_contact, build_media};
use super::ArtifactOutcome;
use crate::classify::aliases::{AliasTable, CALL_ALIASES, CHAT_ALIASES, CONTACT_ALIASES, MEDIA_ALIASES};
use crate::classify::{classify_columns, classify_tree, role_row, KeyView, RECURSIVE_EXTRACTOR};
use crate::config::EngineConfig;
use crate::container::strategy::{ExtractionStrategy, StrategyChain};
use crate::error::ArtifactError;
use crate::normalize::{parse_timestamp_str, value_to_text};
use crate::types::{CaseInfo, DeviceInfo, Provenance, RecordBatch};

pub const TABULAR_JSON_EXTRACTOR: &str = "tabular_json";
pub const KNOWN_KEYS_EXTRACTOR: &str = "known_keys";

const BOM: &[u8] = b"\xEF\xBB\xBF";

const CHAT_SECTIONS: &[&str] = &["messages", "chat_records", "chats", "sms", "chat_messages"];
const CALL_SECTIONS: &[&str] = &["calls", "call_records", "call_logs", "call_log", "calllog"];
const CONTACT_SECTIONS: &[&str] = &["contacts", "contact_list", "address_book"];
const MEDIA_SECTIONS: &[&str] = &["media", "media_files", "files", "attachments"];

const DEVICE_SECTIONS: &[&str] = &["device_info", "device", "deviceinfo"];
const CASE_SECTIONS: &[&str] = &["case_info", "case", "caseinfo"];
const EXTRACTION_DATE_KEYS: &[&str] = &["extraction_date", "extraction_time", "acquisition_date"];

// =============================================================================
// Parsing
// =============================================================================

/// Parse a JSON document, falling back to JSON Lines
///
/// A JSON Lines document becomes an array of its lines. If neither reading
/// works the whole-document error is returned.
pub fn parse_document(bytes: &[u8]) -> Result<Value, ArtifactError> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let whole_err = match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return Err(whole_err.into()),
    };
    let mut lines = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => lines.push(value),
            Err(_) => return Err(whole_err.into()),
        }
    }
    if lines.is_empty() {
        return Err(whole_err.into());
    }
    debug!("parsed {} JSON Lines records", lines.len());
    Ok(Value::Array(lines))
}

// =============================================================================
// Strategies
// =============================================================================

/// Array of flat objects read like a table whose columns are the union of keys
pub struct TabularStrategy;

impl ExtractionStrategy for TabularStrategy {
    fn name(&self) -> &'static str {
        TABULAR_JSON_EXTRACTOR
    }

    fn apply(&self, doc: &Value, prov: &Provenance, config: &EngineConfig) -> Result<RecordBatch, ArtifactError> {
        let items = match doc {
            Value::Array(items) if !items.is_empty() => items,
            _ => return Err(ArtifactError::Unrecognized("not an array of objects".to_string())),
        };

        let mut columns: Vec<String> = Vec::new();
        let mut objects: Vec<&Map<String, Value>> = Vec::with_capacity(items.len());
        for item in items {
            let object = item
                .as_object()
                .ok_or_else(|| ArtifactError::Unrecognized("array holds non-object values".to_string()))?;
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            objects.push(object);
        }

        let roles = classify_columns(&columns);
        if !(roles.is_chat_candidate()
            || roles.is_call_candidate()
            || roles.is_contact_candidate()
            || roles.is_media_candidate())
        {
            return Err(ArtifactError::Unrecognized("no recognizable columns".to_string()));
        }

        let limit = config.max_rows_per_table.unwrap_or(usize::MAX);
        let rows: Vec<Vec<Value>> = objects
            .iter()
            .take(limit)
            .map(|object| {
                columns
                    .iter()
                    .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(batch_from_table(&roles, &rows, prov, config))
    }
}

/// Top-level sections with well-known names, each an array of records
pub struct KnownKeysStrategy;

impl ExtractionStrategy for KnownKeysStrategy {
    fn name(&self) -> &'static str {
        KNOWN_KEYS_EXTRACTOR
    }

    fn apply(&self, doc: &Value, prov: &Provenance, config: &EngineConfig) -> Result<RecordBatch, ArtifactError> {
        let object = doc
            .as_object()
            .ok_or_else(|| ArtifactError::Unrecognized("not an object".to_string()))?;
        let view = KeyView::new(object);

        let mut batch = RecordBatch::default();
        let mut matched = false;

        for (key, items) in sections(&view, CHAT_SECTIONS) {
            matched = true;
            let section_prov = prov.for_source(key);
            batch.chat_records.extend(
                section_rows(items, CHAT_ALIASES).filter_map(|row| build_chat(&row, &section_prov, config)),
            );
        }
        for (key, items) in sections(&view, CALL_SECTIONS) {
            matched = true;
            let section_prov = prov.for_source(key);
            batch
                .call_records
                .extend(section_rows(items, CALL_ALIASES).filter_map(|row| build_call(&row, &section_prov)));
        }
        for (key, items) in sections(&view, CONTACT_SECTIONS) {
            matched = true;
            let section_prov = prov.for_source(key);
            batch
                .contacts
                .extend(section_rows(items, CONTACT_ALIASES).filter_map(|row| build_contact(&row, &section_prov)));
        }
        for (key, items) in sections(&view, MEDIA_SECTIONS) {
            matched = true;
            let section_prov = prov.for_source(key);
            batch
                .media_files
                .extend(section_rows(items, MEDIA_ALIASES).filter_map(|row| build_media(&row, &section_prov)));
        }

        if matched {
            Ok(batch)
        } else {
            Err(ArtifactError::Unrecognized("no known top-level sections".to_string()))
        }
    }
}

/// Depth-bounded walk over the whole tree
pub struct RecursiveStrategy;

impl ExtractionStrategy for RecursiveStrategy {
    fn name(&self) -> &'static str {
        RECURSIVE_EXTRACTOR
    }

    fn apply(&self, doc: &Value, prov: &Provenance, config: &EngineConfig) -> Result<RecordBatch, ArtifactError> {
        Ok(classify_tree(doc, prov, config).batch)
    }
}

/// Present array sections among `names`, in list order
fn sections<'a>(view: &KeyView<'a>, names: &'static [&'static str]) -> Vec<(&'static str, &'a Vec<Value>)> {
    names
        .iter()
        .filter_map(|name| match view.get(name) {
            Some(Value::Array(items)) => Some((*name, items)),
            _ => None,
        })
        .collect()
}

fn section_rows<'a>(
    items: &'a [Value],
    aliases: AliasTable,
) -> impl Iterator<Item = super::records::RoleRow> + 'a {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(move |object| role_row(&KeyView::new(object), aliases))
}

// =============================================================================
// Entry points
// =============================================================================

/// Chain used for JSON entries inside an archive
pub fn archive_chain(config: &EngineConfig) -> StrategyChain {
    let chain = StrategyChain::new().with(TabularStrategy).with(KnownKeysStrategy);
    if config.recursive_fallback_in_archives {
        chain.with(RecursiveStrategy)
    } else {
        chain
    }
}

/// Extract an archive JSON entry through the strategy chain
pub fn extract_json_entry(
    bytes: &[u8],
    prov: &Provenance,
    config: &EngineConfig,
) -> Result<ArtifactOutcome, ArtifactError> {
    let doc = parse_document(bytes)?;
    let (strategy, batch) = archive_chain(config).run(&doc, prov, config)?;
    debug!("{}: {} records via {}", prov.artifact, batch.len(), strategy);
    Ok(ArtifactOutcome::from_batch(batch))
}

/// Extract a single-document container: known keys, then the recursive walk
pub fn extract_single_document(doc: &Value, prov: &Provenance, config: &EngineConfig) -> ArtifactOutcome {
    let mut outcome = ArtifactOutcome::default();

    let known_prov = Provenance {
        extractor: KNOWN_KEYS_EXTRACTOR,
        ..prov.clone()
    };
    match KnownKeysStrategy.apply(doc, &known_prov, config) {
        Ok(batch) => outcome.batch.append(batch),
        Err(e) => debug!("{}: known-key mapping not applicable: {}", prov.artifact, e),
    }

    let recursive_prov = Provenance {
        extractor: RECURSIVE_EXTRACTOR,
        ..prov.clone()
    };
    let tree = classify_tree(doc, &recursive_prov, config);
    if tree.truncated_nodes > 0 {
        outcome.skip(
            &prov.artifact,
            Some(RECURSIVE_EXTRACTOR.to_string()),
            format!("{} nodes beyond depth {}", tree.truncated_nodes, config.max_depth),
        );
    }
    outcome.batch.append(tree.batch);
    outcome
}

// =============================================================================
// Document metadata
// =============================================================================

/// Device details from a `device_info`/`device` section
pub fn document_device_info(doc: &Value) -> DeviceInfo {
    let Some(section) = find_section(doc, DEVICE_SECTIONS) else {
        return DeviceInfo::default();
    };
    let view = KeyView::new(section);
    DeviceInfo {
        manufacturer: text_of(&view, &["manufacturer", "vendor", "make", "brand"]),
        model: text_of(&view, &["model", "device_model", "device_name"]),
        imei: text_of(&view, &["imei", "imei1"]),
        os_version: text_of(&view, &["os_version", "os", "osversion", "platform_version"]),
        build_number: text_of(&view, &["build_number", "build"]),
    }
}

/// Case details and extraction date from `case_info`/`case` sections
pub fn document_case_info(doc: &Value) -> (CaseInfo, Option<chrono::DateTime<chrono::Utc>>) {
    let case_info = find_section(doc, CASE_SECTIONS)
        .map(|section| {
            let view = KeyView::new(section);
            CaseInfo {
                case_number: text_of(&view, &["case_number", "number", "case_id", "case_identifier"]),
                examiner: text_of(&view, &["investigator", "examiner", "examiner_name"]),
                agency: text_of(&view, &["agency", "department", "organization"]),
                description: text_of(&view, &["description", "notes"]),
            }
        })
        .unwrap_or_default();

    let extraction_date = [Some(doc), doc.get("metadata")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .find_map(|object| {
            let view = KeyView::new(object);
            text_of(&view, EXTRACTION_DATE_KEYS).and_then(|s| parse_timestamp_str(&s))
        });

    (case_info, extraction_date)
}

/// Section object at the top level or under `metadata`
fn find_section<'a>(doc: &'a Value, names: &[&str]) -> Option<&'a Map<String, Value>> {
    [Some(doc), doc.get("metadata")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .find_map(|object| {
            let view = KeyView::new(object);
            view.first(names).and_then(Value::as_object)
        })
}

fn text_of(view: &KeyView<'_>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| view.get(key).and_then(value_to_text))
}
