//! Artifact extractors
//!
//! One extractor per artifact shape. All of them reduce their input to
//! [`records::RoleRow`]s and go through the same builders, so normalization
//! is identical whatever the source.
//!
//! ```text
//! relational.rs   embedded SQLite databases
//! tabular.rs      CSV / TSV
//! structured.rs   JSON / JSON Lines documents (strategy chain)
//! xml_report.rs   XML exports with message/call/contact/file elements
//! media.rs        raw media entries (catalog only)
//! ufd.rs          .ufd extraction summaries (device/case metadata)
//! ```

pub mod media;
pub mod records;
pub mod relational;
pub mod structured;
pub mod tabular;
pub mod ufd;
pub mod xml_report;

use crate::types::{RecordBatch, SkipRecord};

/// What one artifact contributed
#[derive(Debug, Default)]
pub struct ArtifactOutcome {
    pub batch: RecordBatch,
    /// Parts of the artifact (tables, strategies) that were left out
    pub skipped: Vec<SkipRecord>,
}

impl ArtifactOutcome {
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch, skipped: Vec::new() }
    }

    pub fn skip(&mut self, artifact: &str, scope: Option<String>, reason: impl ToString) {
        self.skipped.push(SkipRecord {
            artifact: artifact.to_string(),
            scope,
            reason: reason.to_string(),
        });
    }
}
