//! Manifest resolution
//!
//! A UFDR archive usually carries an XML report describing its contents:
//!
//! ```text
//! <project>
//!   <metadata section="Device Info">
//!     <item name="Model">SM-G991B</item> ...
//!   </metadata>
//!   <caseInformation>
//!     <field name="Case Number"><value>2024-17</value></field> ...
//!   </caseInformation>
//!   <taggedFiles>
//!     <file id="..." path="/Root/DCIM/IMG_1.jpg" size="123">
//!       <metadata section="File">
//!         <item name="Local Path">files\Image\IMG_1.jpg</item>
//!       </metadata>
//!     </file>
//!   </taggedFiles>
//! </project>
//! ```
//!
//! Entries are indexed by normalized local path, with the device path as a
//! fallback key, so archive entries can be matched back to their original
//! location. Items outside entries feed device and case details. A manifest
//! that stops parsing part way keeps everything read up to the error.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::extract::media::{CREATED_KEY, DEVICE_PATH_KEY, LOCAL_PATH_KEY, MODIFIED_KEY};
use crate::normalize::parse_timestamp_str;
use crate::types::{CaseInfo, DeviceInfo, SourceMetadata};

/// Context key for the manifest section/category of an entry
pub const SECTION_KEY: &str = "section";
/// Context key for the manifest's own identifier of an entry
pub const MANIFEST_ID_KEY: &str = "manifest_id";

const ENTRY_ELEMENTS: &[&str] = &["file", "entry", "artifact"];
const ITEM_ELEMENTS: &[&str] = &["item", "field"];

fn report_name_regex() -> &'static Regex {
    static REPORT_NAME: OnceLock<Regex> = OnceLock::new();
    REPORT_NAME.get_or_init(|| {
        Regex::new(r"(?i)(^|/)report[^/]*\.xml$").expect("Invalid report name regex")
    })
}

/// Pick the manifest among archive entry names
///
/// Preference goes to an XML file whose name starts with "report", then to
/// any XML file. Names are considered in archive order.
pub fn select_manifest<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    let xml: Vec<&str> = names
        .iter()
        .map(|n| n.as_ref())
        .filter(|n| !n.ends_with('/') && n.to_lowercase().ends_with(".xml"))
        .collect();
    xml.iter()
        .find(|n| report_name_regex().is_match(n))
        .or_else(|| xml.first())
        .copied()
}

/// Normalize an archive or device path for lookups
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let path = path.trim_start_matches("./").trim_start_matches('/');
    path.to_lowercase()
}

/// Compact item name used for matching ("Case Number" -> "casenumber")
fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// =============================================================================
// Types
// =============================================================================

/// One file/entry the manifest describes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub size: Option<u64>,
    pub section: Option<String>,
    /// Archive-relative path ("Local Path" item)
    pub local_path: Option<String>,
    /// Original on-device path (entry `path` attribute)
    pub device_path: Option<String>,
    /// Named items from nested metadata blocks; first value wins
    pub items: BTreeMap<String, String>,
}

impl ManifestEntry {
    fn item_like(&self, needles: &[&str]) -> Option<&str> {
        self.items
            .iter()
            .find(|(name, _)| {
                let name = compact(name);
                needles.iter().any(|n| name.contains(n))
            })
            .map(|(_, value)| value.as_str())
    }

    /// Context merged into records produced from this entry
    pub fn context(&self) -> SourceMetadata {
        let mut ctx = SourceMetadata::new();
        let mut put = |key: &str, value: Option<&str>| {
            if let Some(value) = value {
                ctx.insert(key.to_string(), Value::String(value.to_string()));
            }
        };
        put(SECTION_KEY, self.section.as_deref());
        put(MANIFEST_ID_KEY, self.id.as_deref());
        put(LOCAL_PATH_KEY, self.local_path.as_deref());
        put(DEVICE_PATH_KEY, self.device_path.as_deref());
        put(CREATED_KEY, self.item_like(&["creat", "birth"]));
        put(MODIFIED_KEY, self.item_like(&["modif"]));
        ctx
    }
}

/// Parsed manifest: entry lookup plus device/case details
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    /// Normalized path -> index into `entries`
    index: BTreeMap<String, usize>,
    pub device_info: DeviceInfo,
    pub case_info: CaseInfo,
    pub extraction_date: Option<chrono::DateTime<chrono::Utc>>,
    pub extraction_tool: Option<String>,
    /// Set when parsing stopped early
    pub parse_error: Option<String>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry describing an archive path; exact match first, then suffix match
    pub fn lookup(&self, archive_path: &str) -> Option<&ManifestEntry> {
        let key = normalize_path(archive_path);
        if key.is_empty() {
            return None;
        }
        if let Some(&idx) = self.index.get(&key) {
            return Some(&self.entries[idx]);
        }
        self.index
            .iter()
            .find(|(candidate, _)| {
                key.ends_with(&format!("/{}", candidate)) || candidate.ends_with(&format!("/{}", key))
            })
            .map(|(_, &idx)| &self.entries[idx])
    }

    /// Lookup context for an archive entry (empty when unknown)
    pub fn context_for(&self, archive_path: &str) -> SourceMetadata {
        self.lookup(archive_path).map(ManifestEntry::context).unwrap_or_default()
    }

    fn build_index(&mut self) {
        let mut index = BTreeMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(local) = entry.local_path.as_deref().map(normalize_path).filter(|p| !p.is_empty()) {
                index.entry(local).or_insert(i);
            }
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(device) = entry.device_path.as_deref().map(normalize_path).filter(|p| !p.is_empty()) {
                index.entry(device).or_insert(i);
            }
        }
        self.index = index;
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse manifest XML
pub fn parse_manifest(bytes: &[u8]) -> Manifest {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut manifest = Manifest::default();
    let mut buf = Vec::new();

    // State tracking
    let mut current_entry: Option<ManifestEntry> = None;
    let mut current_section: Option<String> = None;
    let mut current_item: Option<String> = None;
    let mut item_text = String::new();
    // (section, item name, value) found outside entries
    let mut loose_items: Vec<(String, String, String)> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if ENTRY_ELEMENTS.contains(&name.as_str()) && current_entry.is_none() {
                    current_entry = Some(entry_from(e));
                } else if name == "metadata" {
                    current_section = attr(e, "section");
                } else if ITEM_ELEMENTS.contains(&name.as_str()) {
                    current_item = attr(e, "name");
                    item_text.clear();
                } else if current_entry.is_none() {
                    loose_attributes(e, &name, &mut loose_items);
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e);
                if ENTRY_ELEMENTS.contains(&name.as_str()) && current_entry.is_none() {
                    manifest.entries.push(entry_from(e));
                } else if ITEM_ELEMENTS.contains(&name.as_str()) {
                    // <item name="..." value="..."/>
                    if let (Some(item), Some(value)) = (attr(e, "name"), attr(e, "value")) {
                        store_item(&mut current_entry, &mut loose_items, &current_section, item, value);
                    }
                } else if current_entry.is_none() {
                    loose_attributes(e, &name, &mut loose_items);
                }
            }
            Ok(Event::Text(ref e)) => {
                if current_item.is_some() {
                    let text = e.unescape().map(|t| t.into_owned()).unwrap_or_default();
                    item_text.push_str(text.trim());
                }
            }
            Ok(Event::CData(ref e)) => {
                if current_item.is_some() {
                    item_text.push_str(String::from_utf8_lossy(e).trim());
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if ITEM_ELEMENTS.contains(&name.as_str()) {
                    if let Some(item) = current_item.take() {
                        let value = std::mem::take(&mut item_text);
                        if !value.is_empty() {
                            store_item(&mut current_entry, &mut loose_items, &current_section, item, value);
                        }
                    }
                } else if name == "metadata" {
                    current_section = None;
                } else if ENTRY_ELEMENTS.contains(&name.as_str()) {
                    if let Some(entry) = current_entry.take() {
                        manifest.entries.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Error parsing manifest XML: {}", e);
                manifest.parse_error = Some(e.to_string());
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(entry) = current_entry.take() {
        manifest.entries.push(entry);
    }

    apply_loose_items(&mut manifest, &loose_items);
    manifest.build_index();
    debug!(
        "Manifest: {} entries, {} indexed paths",
        manifest.entries.len(),
        manifest.index.len()
    );
    manifest
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

/// Attribute value by case-insensitive local name, trimmed and non-empty
fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let name = String::from_utf8_lossy(a.key.local_name().as_ref()).to_lowercase();
        if name != key {
            return None;
        }
        let value = a
            .unescape_value()
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).trim().to_string());
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn entry_from(e: &BytesStart<'_>) -> ManifestEntry {
    ManifestEntry {
        id: attr(e, "id"),
        name: attr(e, "name"),
        size: attr(e, "size").and_then(|s| s.parse().ok()),
        section: attr(e, "category")
            .or_else(|| attr(e, "section"))
            .or_else(|| attr(e, "type")),
        local_path: attr(e, "local_path").or_else(|| attr(e, "localpath")),
        device_path: attr(e, "path"),
        items: BTreeMap::new(),
    }
}

fn store_item(
    entry: &mut Option<ManifestEntry>,
    loose_items: &mut Vec<(String, String, String)>,
    section: &Option<String>,
    item: String,
    value: String,
) {
    match entry {
        Some(entry) => {
            if compact(&item) == "localpath" && entry.local_path.is_none() {
                entry.local_path = Some(value.clone());
            }
            if entry.section.is_none() {
                if let Some(section) = section.as_deref().filter(|s| !s.eq_ignore_ascii_case("file")) {
                    entry.section = Some(section.to_string());
                }
            }
            entry.items.entry(item).or_insert(value);
        }
        None => loose_items.push((section.clone().unwrap_or_default(), item, value)),
    }
}

/// `<device model="..."/>`-style attributes outside entries
fn loose_attributes(e: &BytesStart<'_>, element: &str, loose_items: &mut Vec<(String, String, String)>) {
    if !matches!(element, "device" | "deviceinfo" | "case" | "caseinfo" | "extraction") {
        return;
    }
    for a in e.attributes().flatten() {
        let key = String::from_utf8_lossy(a.key.local_name().as_ref()).to_string();
        let value = String::from_utf8_lossy(&a.value).trim().to_string();
        if !value.is_empty() {
            loose_items.push((element.to_string(), key, value));
        }
    }
}

/// Which details a section may fill: (device and extraction, case)
///
/// Items outside any `<metadata>` block (`<caseInformation>` fields) only
/// describe the case. "Additional Fields" is where exports put device items.
fn section_scope(section: &str) -> (bool, bool) {
    if section.is_empty() {
        return (false, true);
    }
    let device = section.contains("device") || section.contains("extraction") || section == "additionalfields";
    (device, section.starts_with("case"))
}

/// Map items found outside entries onto device and case details
fn apply_loose_items(manifest: &mut Manifest, items: &[(String, String, String)]) {
    for (section, name, value) in items {
        let section = compact(section);
        let (device_scope, case_scope) = section_scope(&section);
        let key = compact(name);
        let value = Some(value.clone());

        let device = &mut manifest.device_info;
        let case = &mut manifest.case_info;

        if device_scope {
            if key.contains("imei") {
                device.imei = device.imei.take().or(value);
            } else if key.contains("manufacturer") || key.contains("vendor") || key == "make" {
                device.manufacturer = device.manufacturer.take().or(value);
            } else if key.contains("model") {
                device.model = device.model.take().or(value);
            } else if key.contains("osversion") || key == "os" || key.contains("operatingsystem") {
                device.os_version = device.os_version.take().or(value);
            } else if key.contains("buildnumber") {
                device.build_number = device.build_number.take().or(value);
            } else if key.contains("extractiondate") || key.contains("extractionstart") || key == "starttime" {
                if manifest.extraction_date.is_none() {
                    manifest.extraction_date = value.as_deref().and_then(parse_timestamp_str);
                }
            } else if key.contains("acquisitiontool") || key.contains("extractiontool") || key.contains("ufedversion")
            {
                manifest.extraction_tool = manifest.extraction_tool.take().or(value);
            }
        } else if case_scope {
            if key.contains("casenumber") || key.contains("caseidentifier") || key == "number" {
                case.case_number = case.case_number.take().or(value);
            } else if key.contains("examiner") || key.contains("investigator") {
                case.examiner = case.examiner.take().or(value);
            } else if key.contains("agency") || key.contains("department") || key.contains("organization") {
                case.agency = case.agency.take().or(value);
            } else if key.contains("description") {
                case.description = case.description.take().or(value);
            }
        } else {
            trace!("Ignoring manifest item {} outside device/case sections", name);
        }
    }
}
