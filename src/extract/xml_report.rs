//! XML report extraction
//!
//! Some exports describe evidence as XML elements instead of databases:
//!
//! ```text
//! <report>
//!   <device model="Pixel 7" imei="..." os_version="14"/>
//!   <case number="2024-17" investigator="..."/>
//!   <message id="1" sender="+1555..." receiver="..." timestamp="...">
//!     <content>...</content>
//!   </message>
//!   <call caller="..." receiver="..." duration="01:02" type="incoming"/>
//!   <contact name="..."><phone>...</phone><email>...</email></contact>
//!   <file name="IMG_1.jpg" path="/sdcard/DCIM/IMG_1.jpg" size="1.2 MB"/>
//! </report>
//! ```
//!
//! The document is read into a small element tree (depth bounded by
//! `max_depth`) and every element is matched by local name. Fields come
//! from attributes first, then from child element text.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use tracing::{debug, warn};

use super::records::{build_call, build_chat, build_contact, build_media, RoleRow};
use crate::classify::ColumnRole;
use crate::config::EngineConfig;
use crate::error::ArtifactError;
use crate::normalize::{clean_phone_number, looks_like_phone, parse_timestamp_str};
use crate::types::{CaseInfo, DeviceInfo, Provenance, RecordBatch};

/// Extractor label for XML report records
pub const XML_EXTRACTOR: &str = "xml_report";

const CHAT_ELEMENTS: &[&str] = &["message", "chat", "sms", "instantmessage"];
const CALL_ELEMENTS: &[&str] = &["call", "calllog"];
const CONTACT_ELEMENTS: &[&str] = &["contact"];
const MEDIA_ELEMENTS: &[&str] = &["file", "media"];

const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "date", "time", "datetime"];

// =============================================================================
// Element tree
// =============================================================================

/// One parsed element; names and attribute keys are lowercased local names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
        let mut attributes = BTreeMap::new();
        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_lowercase();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            attributes.entry(key).or_insert(value);
        }
        Self { name, attributes, ..Default::default() }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Direct child element by local name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn own_text(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First of `names` as an attribute, else as a child element's text
    pub fn field(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find_map(|name| self.attr(name))
            .or_else(|| names.iter().find_map(|name| self.child(name).and_then(XmlNode::own_text)))
            .map(str::to_string)
    }

    /// Every element in the subtree, this one included, in document order
    pub fn descendants(&self) -> Vec<&XmlNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Parsed tree plus the number of elements cut off by the depth limit
#[derive(Debug, Default)]
pub struct XmlTree {
    /// Synthetic root holding the document element(s)
    pub root: XmlNode,
    pub truncated_nodes: usize,
}

/// Parse XML bytes into an element tree
pub fn parse_tree(bytes: &[u8], max_depth: usize) -> Result<XmlTree, ArtifactError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
    // Open elements below the depth limit, not kept
    let mut skipped_open = 0usize;
    let mut truncated_nodes = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if skipped_open > 0 || stack.len() > max_depth {
                    skipped_open += 1;
                    truncated_nodes += 1;
                } else {
                    stack.push(XmlNode::from_start(e));
                }
            }
            Ok(Event::Empty(ref e)) => {
                if skipped_open > 0 || stack.len() > max_depth {
                    truncated_nodes += 1;
                } else if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::from_start(e));
                }
            }
            Ok(Event::End(_)) => {
                if skipped_open > 0 {
                    skipped_open -= 1;
                } else if stack.len() > 1 {
                    if let Some(node) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(node);
                        }
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if skipped_open == 0 {
                    let text = e.unescape().map(|t| t.into_owned()).unwrap_or_default();
                    append_text(&mut stack, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if skipped_open == 0 {
                    let text = String::from_utf8_lossy(e).into_owned();
                    append_text(&mut stack, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    // Unclosed elements at EOF are kept
    while stack.len() > 1 {
        if let Some(node) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }

    let root = stack.pop().unwrap_or_default();
    Ok(XmlTree { root, truncated_nodes })
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    if let Some(node) = stack.last_mut() {
        if !node.text.is_empty() {
            node.text.push(' ');
        }
        node.text.push_str(text.trim());
    }
}

// =============================================================================
// Records
// =============================================================================

/// Everything an XML report yields
#[derive(Debug, Default)]
pub struct XmlReport {
    pub batch: RecordBatch,
    pub device_info: DeviceInfo,
    pub case_info: CaseInfo,
    pub extraction_date: Option<chrono::DateTime<chrono::Utc>>,
    pub truncated_nodes: usize,
}

pub fn extract_xml_report(
    bytes: &[u8],
    prov: &Provenance,
    config: &EngineConfig,
) -> Result<XmlReport, ArtifactError> {
    let tree = parse_tree(bytes, config.max_depth)?;
    if tree.truncated_nodes > 0 {
        warn!(
            "{}: {} elements deeper than {} levels were not read",
            prov.artifact, tree.truncated_nodes, config.max_depth
        );
    }

    let mut report = XmlReport {
        truncated_nodes: tree.truncated_nodes,
        ..Default::default()
    };

    for node in tree.root.descendants() {
        let name = node.name.as_str();
        if CHAT_ELEMENTS.contains(&name) {
            report.batch.chat_records.extend(chat_from(node, prov, config));
        } else if CALL_ELEMENTS.contains(&name) {
            report.batch.call_records.extend(call_from(node, prov));
        } else if CONTACT_ELEMENTS.contains(&name) {
            report.batch.contacts.extend(contact_from(node, prov));
        } else if MEDIA_ELEMENTS.contains(&name) {
            report.batch.media_files.extend(media_from(node, prov));
        } else if report.device_info.is_empty() && (name == "device" || name == "deviceinfo") {
            report.device_info = device_from(node);
        } else if name == "case" || name == "caseinfo" {
            report.case_info.merge_missing(case_from(node));
        } else if name == "extraction_date" || name == "extractiondate" {
            if report.extraction_date.is_none() {
                report.extraction_date = node
                    .own_text()
                    .or_else(|| node.attr("value"))
                    .and_then(parse_timestamp_str);
            }
        }
    }

    debug!("{}: {} records from XML", prov.artifact, report.batch.len());
    Ok(report)
}

/// Participant text, standardized when it reads like a phone number
fn participant(raw: Option<String>) -> Option<String> {
    raw.map(|raw| {
        if looks_like_phone(&raw) {
            clean_phone_number(&raw).unwrap_or(raw)
        } else {
            raw
        }
    })
}

fn with_id(node: &XmlNode, key: &str) -> RoleRow {
    let mut row = RoleRow::new();
    if let Some(id) = node.field(&["id"]) {
        row.metadata_mut().insert(key.to_string(), Value::String(id));
    }
    row
}

fn chat_from(node: &XmlNode, prov: &Provenance, config: &EngineConfig) -> Option<crate::types::ChatRecord> {
    let sender = participant(node.field(&["sender", "from"]));
    let receiver = participant(node.field(&["receiver", "to"]));
    if sender.is_none() && receiver.is_none() {
        return None;
    }

    let content = node
        .field(&["content", "body", "text"])
        .or_else(|| node.children.is_empty().then(|| node.own_text().map(str::to_string)).flatten());

    let mut row = with_id(node, "message_id");
    if let Some(thread) = node.field(&["thread_id", "thread"]) {
        row.metadata_mut().insert("thread_id".to_string(), Value::String(thread));
    }
    row.insert_text(ColumnRole::Content, content);
    row.insert_text(ColumnRole::Sender, sender);
    row.insert_text(ColumnRole::Receiver, receiver);
    row.insert_text(ColumnRole::AppName, node.field(&["app", "app_name", "application", "source"]));
    row.insert_text(ColumnRole::Timestamp, node.field(TIMESTAMP_FIELDS));
    row.insert_text(ColumnRole::Kind, node.field(&["type", "message_type"]));
    row.insert_text(ColumnRole::Deleted, node.field(&["deleted", "is_deleted"]));

    build_chat(&row, &prov.for_source(&node.name), config)
}

fn call_from(node: &XmlNode, prov: &Provenance) -> Option<crate::types::CallRecord> {
    let mut row = with_id(node, "call_id");
    row.insert_text(ColumnRole::Sender, participant(node.field(&["caller", "from", "caller_number"])));
    row.insert_text(ColumnRole::Receiver, participant(node.field(&["receiver", "to", "receiver_number", "callee"])));
    row.insert_text(ColumnRole::Kind, node.field(&["type", "call_type", "direction"]));
    row.insert_text(ColumnRole::Duration, node.field(&["duration"]));
    row.insert_text(ColumnRole::Timestamp, node.field(TIMESTAMP_FIELDS));

    build_call(&row, &prov.for_source(&node.name))
}

fn contact_from(node: &XmlNode, prov: &Provenance) -> Option<crate::types::Contact> {
    let mut phones: Vec<Value> = Vec::new();
    let mut emails: Vec<Value> = Vec::new();

    if let Some(phone) = node.attr("phone") {
        phones.push(Value::String(phone.to_string()));
    }
    if let Some(email) = node.attr("email") {
        emails.push(Value::String(email.to_string()));
    }
    for child in node.descendants().into_iter().skip(1) {
        match child.name.as_str() {
            "phone" | "phonenumber" | "phone_number" => {
                if let Some(v) = child.own_text().or_else(|| child.attr("number")).or_else(|| child.attr("value")) {
                    phones.push(Value::String(v.to_string()));
                }
            }
            "email" | "emailaddress" | "email_address" => {
                if let Some(v) = child.own_text().or_else(|| child.attr("address")).or_else(|| child.attr("value")) {
                    emails.push(Value::String(v.to_string()));
                }
            }
            _ => {}
        }
    }

    // Nameless contacts are kept under their first number or address
    let name = node.field(&["name", "display_name", "full_name"]).or_else(|| {
        phones
            .iter()
            .filter_map(Value::as_str)
            .find_map(clean_phone_number)
            .or_else(|| emails.iter().filter_map(Value::as_str).find(|e| e.contains('@')).map(str::to_string))
    });

    let mut row = with_id(node, "contact_id");
    row.insert_text(ColumnRole::Name, name);
    row.insert(ColumnRole::Phone, Value::Array(phones));
    row.insert(ColumnRole::Email, Value::Array(emails));

    build_contact(&row, &prov.for_source(&node.name))
}

fn media_from(node: &XmlNode, prov: &Provenance) -> Option<crate::types::MediaFile> {
    let mut row = with_id(node, "file_id");
    row.insert_text(ColumnRole::Filename, node.field(&["name", "filename", "file_name"]));
    row.insert_text(ColumnRole::Path, node.field(&["path", "file_path", "local_path"]));
    row.insert_text(ColumnRole::Mime, node.field(&["type", "mime_type", "mime", "file_type"]));
    row.insert_text(ColumnRole::Size, node.field(&["size", "file_size"]));
    row.insert_text(ColumnRole::Created, node.field(&["created", "created_date", "creation_time"]));
    row.insert_text(ColumnRole::Modified, node.field(&["modified", "modified_date", "last_modified"]));
    row.insert_text(ColumnRole::HashMd5, node.field(&["md5", "hash_md5"]));
    row.insert_text(ColumnRole::HashSha256, node.field(&["sha256", "hash_sha256"]));

    build_media(&row, &prov.for_source(&node.name))
}

fn device_from(node: &XmlNode) -> DeviceInfo {
    DeviceInfo {
        manufacturer: node.field(&["manufacturer", "vendor", "make"]),
        model: node.field(&["model"]),
        imei: node.field(&["imei", "imei1"]),
        os_version: node.field(&["os_version", "os", "osversion"]),
        build_number: node.field(&["build_number", "build"]),
    }
}

fn case_from(node: &XmlNode) -> CaseInfo {
    CaseInfo {
        case_number: node.field(&["number", "case_number", "id"]),
        examiner: node.field(&["investigator", "examiner"]),
        agency: node.field(&["agency", "department"]),
        description: node.field(&["description"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<report>
  <device model="Pixel 7" imei="356938035643809">
    <os_version>14</os_version>
  </device>
  <case number="2024-17" investigator="J. Doe"/>
  <messages>
    <message id="m1" sender="+1 (555) 010-0001" receiver="bob" timestamp="2024-01-05T10:00:00Z">
      <content>Meet at 5 &amp; bring docs</content>
    </message>
    <message id="m2" sender="alice">no receiver but has sender</message>
    <message id="m3"><content>orphan</content></message>
  </messages>
  <call caller="+15550100001" receiver="+15550100002" duration="01:02" type="incoming"/>
  <contact name="Carol">
    <phone>+44 20 7946 0958</phone>
    <email address="carol@example.com"/>
  </contact>
  <file name="IMG_1.jpg" path="/sdcard/DCIM/IMG_1.jpg" size="1 KB" type="image/jpeg"/>
</report>"#;

    fn prov() -> Provenance {
        Provenance::new("export/report_data.xml", "export/report_data.xml", XML_EXTRACTOR)
    }

    #[test]
    fn test_full_report() {
        let report = extract_xml_report(REPORT.as_bytes(), &prov(), &EngineConfig::default()).unwrap();

        assert_eq!(report.device_info.model.as_deref(), Some("Pixel 7"));
        assert_eq!(report.device_info.os_version.as_deref(), Some("14"));
        assert_eq!(report.case_info.case_number.as_deref(), Some("2024-17"));
        assert_eq!(report.case_info.examiner.as_deref(), Some("J. Doe"));

        let chats = &report.batch.chat_records;
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].content, "Meet at 5 & bring docs");
        assert_eq!(chats[0].sender.as_deref(), Some("+15550100001"));
        assert_eq!(chats[0].receiver.as_deref(), Some("bob"));
        assert_eq!(chats[0].source_metadata["message_id"], "m1");
        assert_eq!(chats[1].content, "no receiver but has sender");

        assert_eq!(report.batch.call_records.len(), 1);
        assert_eq!(report.batch.call_records[0].duration_seconds, 62);
        assert_eq!(report.batch.call_records[0].call_type, "incoming");

        assert_eq!(report.batch.contacts.len(), 1);
        assert_eq!(report.batch.contacts[0].phone_numbers, vec!["+442079460958"]);
        assert_eq!(report.batch.contacts[0].email_addresses, vec!["carol@example.com"]);

        assert_eq!(report.batch.media_files.len(), 1);
        assert_eq!(report.batch.media_files[0].file_size_bytes, 1024);
        assert_eq!(report.batch.media_files[0].file_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_depth_limit_truncates() {
        let xml = "<a><b><c><message sender=\"x\">deep</message></c></b></a>";
        let tree = parse_tree(xml.as_bytes(), 2).unwrap();
        assert_eq!(tree.truncated_nodes, 2);
        let config = EngineConfig { max_depth: 2, ..Default::default() };
        let report = extract_xml_report(xml.as_bytes(), &prov(), &config).unwrap();
        assert!(report.batch.chat_records.is_empty());
    }

    #[test]
    fn test_nameless_contact_uses_phone_or_email() {
        let xml = r#"<report>
            <contact id="c1"><phone>+44 20 7946 0958</phone><email>x@example.com</email></contact>
            <contact id="c2"><email>only@example.com</email></contact>
            <contact id="c3"><note>nothing to go on</note></contact>
        </report>"#;
        let report = extract_xml_report(xml.as_bytes(), &prov(), &EngineConfig::default()).unwrap();
        let contacts = &report.batch.contacts;
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "+442079460958");
        assert_eq!(contacts[0].phone_numbers, vec!["+442079460958".to_string()]);
        assert_eq!(contacts[0].email_addresses, vec!["x@example.com".to_string()]);
        assert_eq!(contacts[1].name, "only@example.com");
    }

    #[test]
    fn test_malformed_xml_errors() {
        assert!(parse_tree(b"<a><b></a>", 64).is_err());
    }

    #[test]
    fn test_field_prefers_attribute() {
        let tree = parse_tree(br#"<x name="attr"><name>child</name></x>"#, 64).unwrap();
        let x = &tree.root.children[0];
        assert_eq!(x.field(&["name"]).as_deref(), Some("attr"));
        assert_eq!(x.child("name").and_then(XmlNode::own_text), Some("child"));
    }
}
