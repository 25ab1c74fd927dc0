//! Engine configuration
//!
//! An [`EngineConfig`] is handed to [`crate::Extractor::new`]; nothing in the
//! engine reads ambient/global settings. Config files are plain JSON and any
//! omitted field keeps its default.
//!
//! ```json
//! {
//!   "allow_duplicate_classification": true,
//!   "max_depth": 32,
//!   "catalog_embedded_media": true
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractResult;

/// Default recursion bound for nested documents
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default per-entry size limit (512 MiB)
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 512 * 1024 * 1024;

/// Generic label for chats whose source names no application
pub const DEFAULT_APP_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep records that several extraction passes produced for the same data
    pub allow_duplicate_classification: bool,
    /// Maximum nesting level visited by the recursive classifier
    pub max_depth: usize,
    /// Archive entries above this size are skipped
    pub max_entry_bytes: u64,
    /// Optional cap on rows read per table and category
    pub max_rows_per_table: Option<usize>,
    /// App name for chats with no app column/key
    pub fallback_app_name: String,
    /// Walk unmatched archive JSON documents with the recursive classifier
    pub recursive_fallback_in_archives: bool,
    /// Emit MediaFile records for raw media entries found in the archive
    pub catalog_embedded_media: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_duplicate_classification: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            max_rows_per_table: None,
            fallback_app_name: DEFAULT_APP_NAME.to_string(),
            recursive_fallback_in_archives: true,
            catalog_embedded_media: false,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config document
    pub fn from_json_str(json: &str) -> ExtractResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file from disk
    pub fn load(path: &Path) -> ExtractResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Whether `rows` already read hits the configured per-table cap
    pub(crate) fn row_limit_reached(&self, rows: usize) -> bool {
        self.max_rows_per_table.map(|max| rows >= max).unwrap_or(false)
    }
}
