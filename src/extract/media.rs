//! Embedded media catalog
//!
//! Raw media entries (photos, voice notes, videos, documents) carry no
//! records of their own. When cataloguing is enabled each one becomes a
//! [`MediaFile`] with its detected type and content hashes; the original
//! device path and timestamps come from the manifest when it knows the
//! entry.

use serde_json::Value;

use super::records::file_name_of;
use crate::common::hash::{compute_hash, HashAlgorithm};
use crate::common::magic::FileType;
use crate::normalize::parse_timestamp_str;
use crate::types::{MediaFile, Provenance};

/// Extractor label for catalogued media
pub const MEDIA_EXTRACTOR: &str = "media_catalog";

/// Manifest context keys read back when cataloguing
pub const LOCAL_PATH_KEY: &str = "local_path";
pub const DEVICE_PATH_KEY: &str = "device_path";
pub const CREATED_KEY: &str = "created";
pub const MODIFIED_KEY: &str = "modified";

/// Catalogue one media entry
pub fn catalog_entry(entry_name: &str, bytes: &[u8], file_type: &FileType, prov: &Provenance) -> MediaFile {
    let context = |key: &str| prov.extras.get(key).and_then(Value::as_str).map(str::to_string);

    let file_path = context(DEVICE_PATH_KEY)
        .or_else(|| context(LOCAL_PATH_KEY))
        .unwrap_or_else(|| entry_name.to_string());
    let filename = file_name_of(&file_path)
        .or_else(|| file_name_of(entry_name))
        .unwrap_or_else(|| entry_name.to_string());

    MediaFile {
        filename,
        file_path: Some(file_path),
        file_type: Some(file_type.mime.clone()),
        file_size_bytes: bytes.len() as u64,
        created_at: context(CREATED_KEY).and_then(|s| parse_timestamp_str(&s)),
        modified_at: context(MODIFIED_KEY).and_then(|s| parse_timestamp_str(&s)),
        hash_md5: Some(compute_hash(bytes, HashAlgorithm::Md5)),
        hash_sha256: Some(compute_hash(bytes, HashAlgorithm::Sha256)),
        source_metadata: prov.stamp(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::magic::detect_file_type;
    use crate::types::SourceMetadata;

    #[test]
    fn test_catalog_without_manifest() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        let file_type = detect_file_type(&bytes).unwrap();
        let prov = Provenance::new("files/Image/IMG_0001.jpg", "files/Image/IMG_0001.jpg", MEDIA_EXTRACTOR);
        let media = catalog_entry("files/Image/IMG_0001.jpg", &bytes, &file_type, &prov);
        assert_eq!(media.filename, "IMG_0001.jpg");
        assert_eq!(media.file_path.as_deref(), Some("files/Image/IMG_0001.jpg"));
        assert_eq!(media.file_type.as_deref(), Some("image/jpeg"));
        assert_eq!(media.file_size_bytes, 8);
        assert_eq!(media.hash_md5.as_ref().map(String::len), Some(32));
        assert_eq!(media.hash_sha256.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_catalog_uses_manifest_context() {
        let bytes = b"%PDF-1.7 minimal";
        let file_type = detect_file_type(bytes).unwrap();
        let mut extras = SourceMetadata::new();
        extras.insert(DEVICE_PATH_KEY.into(), "/sdcard/Download/invoice.pdf".into());
        extras.insert(MODIFIED_KEY.into(), "2024-01-02T03:04:05Z".into());
        let prov = Provenance::new("files/Document/0001", "files/Document/0001", MEDIA_EXTRACTOR)
            .with_extras(extras);

        let media = catalog_entry("files/Document/0001", bytes, &file_type, &prov);
        assert_eq!(media.filename, "invoice.pdf");
        assert_eq!(media.file_path.as_deref(), Some("/sdcard/Download/invoice.pdf"));
        assert!(media.modified_at.is_some());
        assert!(media.created_at.is_none());
        assert_eq!(media.source_metadata["device_path"], "/sdcard/Download/invoice.pdf");
    }
}
