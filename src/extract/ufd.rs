//! UFD extraction summary parsing
//!
//! `.ufd` entries are INI-style summaries written next to an extraction:
//! - `[Crime Case]`: case identifier, examiner, department
//! - `[DeviceInfo]`: IMEI, model, OS version, vendor
//! - `[General]`: acquisition tool and version, extraction timestamp
//!
//! They only ever fill gaps; manifest values take precedence.

use std::collections::HashMap;

use crate::normalize::parse_timestamp_str;
use crate::types::{CaseInfo, DeviceInfo};

/// Entry extension for extraction summaries
pub const UFD_EXTENSION: &str = "ufd";

/// Metadata recovered from one `.ufd` entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UfdSummary {
    pub device_info: DeviceInfo,
    pub case_info: CaseInfo,
    pub extraction_tool: Option<String>,
    pub extraction_date: Option<chrono::DateTime<chrono::Utc>>,
}

type Sections = HashMap<String, HashMap<String, String>>;

/// Parse UFD bytes (INI format)
pub fn parse_ufd(bytes: &[u8]) -> UfdSummary {
    let content = String::from_utf8_lossy(bytes);
    let mut sections: Sections = HashMap::new();
    let mut current_section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            current_section = line[1..line.len() - 1].trim().to_string();
            sections.entry(current_section.clone()).or_default();
            continue;
        }

        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim().to_string();
            let value = line[eq_pos + 1..].trim().to_string();
            if !current_section.is_empty() && !value.is_empty() {
                if let Some(section) = sections.get_mut(&current_section) {
                    section.entry(key).or_insert(value);
                }
            }
        }
    }

    let get = |section: &str, key: &str| sections.get(section).and_then(|s| s.get(key)).cloned();

    let device_info = DeviceInfo {
        manufacturer: get("DeviceInfo", "Vendor").or_else(|| get("General", "Vendor")),
        model: get("DeviceInfo", "Model").or_else(|| get("General", "Model")),
        imei: get("DeviceInfo", "IMEI1").or_else(|| get("DeviceInfo", "IMEI")),
        os_version: get("DeviceInfo", "OS"),
        build_number: get("DeviceInfo", "BuildNumber"),
    };

    let case_info = CaseInfo {
        case_number: get("Crime Case", "Case Identifier"),
        examiner: get("Crime Case", "Examiner Name"),
        agency: get("Crime Case", "Department"),
        description: get("Crime Case", "Crime Type"),
    };

    let extraction_tool = match (get("General", "AcquisitionTool"), get("General", "Version")) {
        (Some(tool), Some(version)) => Some(format!("{} {}", tool, version)),
        (tool, _) => tool,
    };

    let extraction_date = get("General", "Date").and_then(|d| parse_timestamp_str(&d));

    UfdSummary { device_info, case_info, extraction_tool, extraction_date }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[Crime Case]
Case Identifier=CASE-0042
Examiner Name=R. Patel
Department=Digital Forensics Unit

[DeviceInfo]
Vendor=Samsung
Model=SM-G991B
IMEI1=356938035643809
OS=Android 13

[General]
AcquisitionTool=UFED 4PC
Version=7.60
Date=2024-03-01 09:15:00
";

    #[test]
    fn test_parse_sample() {
        let summary = parse_ufd(SAMPLE.as_bytes());
        assert_eq!(summary.device_info.manufacturer.as_deref(), Some("Samsung"));
        assert_eq!(summary.device_info.model.as_deref(), Some("SM-G991B"));
        assert_eq!(summary.device_info.imei.as_deref(), Some("356938035643809"));
        assert_eq!(summary.device_info.os_version.as_deref(), Some("Android 13"));
        assert_eq!(summary.case_info.case_number.as_deref(), Some("CASE-0042"));
        assert_eq!(summary.case_info.examiner.as_deref(), Some("R. Patel"));
        assert_eq!(summary.extraction_tool.as_deref(), Some("UFED 4PC 7.60"));
        assert!(summary.extraction_date.is_some());
    }

    #[test]
    fn test_empty_values_ignored() {
        let summary = parse_ufd(b"[DeviceInfo]\nModel=\nIMEI=123456789012345\n");
        assert!(summary.device_info.model.is_none());
        assert_eq!(summary.device_info.imei.as_deref(), Some("123456789012345"));
    }

    #[test]
    fn test_garbage_yields_nothing() {
        let summary = parse_ufd(&[0xFF, 0xFE, 0x00, 0x41]);
        assert!(summary.device_info.is_empty());
        assert!(summary.extraction_tool.is_none());
    }
}
