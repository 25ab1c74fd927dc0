//! UFDR evidence extraction engine
//!
//! Turns a mobile extraction report container into a
//! [`NormalizedEvidenceSet`]: chats, calls, contacts and media files in one
//! canonical shape, each record tagged with the artifact that produced it.
//!
//! ```no_run
//! let bytes = std::fs::read("case.ufdr").unwrap();
//! let set = ufdr_extract::extract(&bytes, ".ufdr").unwrap();
//! println!("{} chats", set.chat_records.len());
//! ```
//!
//! ## Module Structure
//! ```text
//! src/
//! ├── container/   - Dispatcher, entry detection, strategy chain
//! ├── manifest.rs  - report.xml manifest resolver
//! ├── extract/     - Per-artifact extractors and record builders
//! ├── classify/    - Column roles, key aliases, recursive classifier
//! ├── normalize.rs - Timestamp, duration, size, phone coercion
//! ├── dedup.rs     - Cross-pass duplicate suppression
//! ├── common/      - Hashing and file signatures
//! ├── config.rs    - EngineConfig
//! ├── error.rs     - ExtractError / ArtifactError
//! ├── logging.rs   - tracing setup
//! └── types.rs     - Output record types
//! ```

pub mod classify;
pub mod common;
pub mod config;
pub mod container;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod logging;
pub mod manifest;
pub mod normalize;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::EngineConfig;
pub use container::{extract, extract_path, Extractor, UFDR_EXTENSION};
pub use error::{ExtractError, ExtractResult};
pub use types::{
    CallRecord, CaseInfo, ChatRecord, Contact, ContainerKind, DeviceInfo, ExtractionMetadata, MediaFile,
    NormalizedEvidenceSet, SkipRecord,
};
