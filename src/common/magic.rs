//! File type detection via magic signatures
//!
//! Detects evidence media types from header bytes without trusting the entry
//! name. Extensions are only a fallback for formats with no signature.

use serde::Serialize;

// =============================================================================
// File Type Structures
// =============================================================================

/// Detected file type information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileType {
    /// MIME type (e.g., "image/jpeg")
    pub mime: String,
    /// Category for grouping
    pub category: FileCategory,
    /// Detection confidence
    pub confidence: Confidence,
}

/// File type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileCategory {
    Image,
    Audio,
    Video,
    /// PDF, Office, RTF
    Document,
    /// SQLite databases
    Database,
    /// ZIP and friends
    Archive,
}

impl FileCategory {
    /// Categories catalogued as media evidence
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            FileCategory::Image | FileCategory::Audio | FileCategory::Video | FileCategory::Document
        )
    }
}

/// Detection confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    /// Strong magic signature match
    High,
    /// Partial or common signature
    Medium,
    /// Extension only
    Low,
}

impl FileType {
    fn new(mime: &str, category: FileCategory) -> Self {
        Self {
            mime: mime.to_string(),
            category,
            confidence: Confidence::High,
        }
    }

    fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

// =============================================================================
// Magic Detection
// =============================================================================

/// MPEG audio frame sync with valid version, layer, bitrate and rate bits
///
/// `FF FE` is a UTF-16LE byte order mark, not a frame.
fn is_mpeg_frame_header(header: &[u8]) -> bool {
    if header.len() < 3 || header[0] != 0xFF || header[1] == 0xFE || (header[1] & 0xE0) != 0xE0 {
        return false;
    }
    let version = (header[1] >> 3) & 0x03;
    let layer = (header[1] >> 1) & 0x03;
    let bitrate = header[2] >> 4;
    let rate = (header[2] >> 2) & 0x03;
    version != 0x01 && layer != 0x00 && bitrate != 0x0F && rate != 0x03
}

/// Detect file type from header bytes
///
/// 16 bytes are enough for every signature here. Returns None if the type
/// cannot be determined.
pub fn detect_file_type(header: &[u8]) -> Option<FileType> {
    if header.is_empty() {
        return None;
    }

    // =========================================================================
    // Images
    // =========================================================================

    // JPEG: FF D8 FF
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(FileType::new("image/jpeg", FileCategory::Image));
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if header.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(FileType::new("image/png", FileCategory::Image));
    }

    // GIF: GIF87a or GIF89a
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Some(FileType::new("image/gif", FileCategory::Image));
    }

    // WebP: RIFF....WEBP
    if header.len() >= 12 && header[..4] == *b"RIFF" && header[8..12] == *b"WEBP" {
        return Some(FileType::new("image/webp", FileCategory::Image));
    }

    // BMP: BM
    if header.starts_with(b"BM") && header.len() >= 6 {
        return Some(FileType::new("image/bmp", FileCategory::Image).with_confidence(Confidence::Medium));
    }

    // ISO base media: ....ftyp<brand>
    if header.len() >= 12 && header[4..8] == *b"ftyp" {
        let brand = &header[8..12];
        let mime = match brand {
            b"heic" | b"heix" | b"hevc" | b"mif1" => Some(("image/heic", FileCategory::Image)),
            b"M4A " => Some(("audio/mp4", FileCategory::Audio)),
            b"3gp4" | b"3gp5" | b"3gp6" | b"3g2a" => Some(("video/3gpp", FileCategory::Video)),
            b"qt  " => Some(("video/quicktime", FileCategory::Video)),
            b"isom" | b"iso2" | b"mp41" | b"mp42" | b"avc1" | b"M4V " => Some(("video/mp4", FileCategory::Video)),
            _ => None,
        };
        if let Some((mime, category)) = mime {
            return Some(FileType::new(mime, category));
        }
    }

    // =========================================================================
    // Audio
    // =========================================================================

    // MP3: ID3 or frame sync
    if header.starts_with(b"ID3") {
        return Some(FileType::new("audio/mpeg", FileCategory::Audio));
    }
    if is_mpeg_frame_header(header) {
        return Some(FileType::new("audio/mpeg", FileCategory::Audio).with_confidence(Confidence::Medium));
    }

    // WAV: RIFF....WAVE
    if header.len() >= 12 && header[..4] == *b"RIFF" && header[8..12] == *b"WAVE" {
        return Some(FileType::new("audio/wav", FileCategory::Audio));
    }

    // AMR voice notes: #!AMR
    if header.starts_with(b"#!AMR") {
        return Some(FileType::new("audio/amr", FileCategory::Audio));
    }

    // OGG / Opus: OggS
    if header.starts_with(b"OggS") {
        return Some(FileType::new("audio/ogg", FileCategory::Audio));
    }

    // FLAC: fLaC
    if header.starts_with(b"fLaC") {
        return Some(FileType::new("audio/flac", FileCategory::Audio));
    }

    // =========================================================================
    // Video
    // =========================================================================

    // AVI: RIFF....AVI
    if header.len() >= 12 && header[..4] == *b"RIFF" && header[8..12] == *b"AVI " {
        return Some(FileType::new("video/avi", FileCategory::Video));
    }

    // MKV/WebM: 1A 45 DF A3 (EBML)
    if header.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some(FileType::new("video/x-matroska", FileCategory::Video));
    }

    // =========================================================================
    // Documents
    // =========================================================================

    // PDF: %PDF
    if header.starts_with(b"%PDF") {
        return Some(FileType::new("application/pdf", FileCategory::Document));
    }

    // RTF: {\rtf
    if header.starts_with(b"{\\rtf") {
        return Some(FileType::new("application/rtf", FileCategory::Document));
    }

    // OLE compound document: D0 CF 11 E0 A1 B1 1A E1
    if header.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return Some(FileType::new("application/x-ole-storage", FileCategory::Document));
    }

    // =========================================================================
    // Containers
    // =========================================================================

    // SQLite: SQLite format 3\x00
    if header.starts_with(b"SQLite format 3\x00") {
        return Some(FileType::new("application/x-sqlite3", FileCategory::Database));
    }

    // ZIP: PK\x03\x04 (also empty archives, PK\x05\x06)
    if header.starts_with(&[0x50, 0x4B, 0x03, 0x04]) || header.starts_with(&[0x50, 0x4B, 0x05, 0x06]) {
        return Some(FileType::new("application/zip", FileCategory::Archive));
    }

    None
}

/// Guess a media type from a file extension (lowercase, no dot)
pub fn detect_by_extension(extension: &str) -> Option<FileType> {
    let (mime, category) = match extension {
        "jpg" | "jpeg" => ("image/jpeg", FileCategory::Image),
        "png" => ("image/png", FileCategory::Image),
        "gif" => ("image/gif", FileCategory::Image),
        "webp" => ("image/webp", FileCategory::Image),
        "heic" | "heif" => ("image/heic", FileCategory::Image),
        "bmp" => ("image/bmp", FileCategory::Image),
        "mp3" => ("audio/mpeg", FileCategory::Audio),
        "m4a" => ("audio/mp4", FileCategory::Audio),
        "aac" => ("audio/aac", FileCategory::Audio),
        "amr" => ("audio/amr", FileCategory::Audio),
        "opus" | "ogg" => ("audio/ogg", FileCategory::Audio),
        "wav" => ("audio/wav", FileCategory::Audio),
        "mp4" | "m4v" => ("video/mp4", FileCategory::Video),
        "3gp" => ("video/3gpp", FileCategory::Video),
        "mov" => ("video/quicktime", FileCategory::Video),
        "mkv" | "webm" => ("video/x-matroska", FileCategory::Video),
        "avi" => ("video/avi", FileCategory::Video),
        "pdf" => ("application/pdf", FileCategory::Document),
        "doc" | "xls" | "ppt" => ("application/x-ole-storage", FileCategory::Document),
        "docx" => (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            FileCategory::Document,
        ),
        _ => return None,
    };
    Some(FileType::new(mime, category).with_confidence(Confidence::Low))
}

/// Signature first, extension as fallback
pub fn detect(header: &[u8], extension: &str) -> Option<FileType> {
    detect_file_type(header).or_else(|| detect_by_extension(extension))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let ft = detect_file_type(&header).unwrap();
        assert_eq!(ft.mime, "image/jpeg");
        assert_eq!(ft.category, FileCategory::Image);
        assert!(ft.category.is_media());
    }

    #[test]
    fn test_detect_png() {
        let header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let ft = detect_file_type(&header).unwrap();
        assert_eq!(ft.mime, "image/png");
    }

    #[test]
    fn test_detect_voice_note() {
        let ft = detect_file_type(b"#!AMR\n\x3c").unwrap();
        assert_eq!(ft.mime, "audio/amr");
        assert_eq!(ft.category, FileCategory::Audio);
    }

    #[test]
    fn test_mp3_frame_sync_not_utf16_text() {
        let ft = detect_file_type(&[0xFF, 0xFB, 0x90, 0x64]).unwrap();
        assert_eq!(ft.mime, "audio/mpeg");
        assert_eq!(ft.confidence, Confidence::Medium);

        // "hi" as UTF-16LE with BOM
        assert!(detect_file_type(&[0xFF, 0xFE, b'h', 0x00, b'i', 0x00]).is_none());
        assert!(detect(&[0xFF, 0xFE, b'h', 0x00], "txt").is_none());
    }

    #[test]
    fn test_detect_mp4_brand() {
        let header = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00";
        let ft = detect_file_type(header).unwrap();
        assert_eq!(ft.mime, "video/mp4");
    }

    #[test]
    fn test_detect_sqlite_not_media() {
        let ft = detect_file_type(b"SQLite format 3\x00").unwrap();
        assert_eq!(ft.mime, "application/x-sqlite3");
        assert!(!ft.category.is_media());
    }

    #[test]
    fn test_extension_fallback() {
        let ft = detect(b"\x00\x01\x02", "opus").unwrap();
        assert_eq!(ft.mime, "audio/ogg");
        assert_eq!(ft.confidence, Confidence::Low);
        assert!(detect(b"\x00\x01\x02", "bin").is_none());
    }

    #[test]
    fn test_unknown() {
        let header = [0x00, 0x00, 0x00, 0x00];
        assert!(detect_file_type(&header).is_none());
    }
}
