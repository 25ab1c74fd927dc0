//! Error types for evidence extraction
//!
//! Only [`ExtractError`] ever reaches a caller. Everything that goes wrong
//! inside a single artifact is an [`ArtifactError`], which the dispatcher
//! turns into a skip record and logs.

use std::fmt;
use std::io;

/// Result type alias for engine entry points
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors surfaced to the caller of the engine
#[derive(Debug)]
pub enum ExtractError {
    /// Declared extension is not the supported evidence container type
    UnsupportedContainer { declared: String },
    /// I/O error reading a container or config file from disk
    Io(io::Error),
    /// Config file is not valid JSON for [`crate::config::EngineConfig`]
    Config(serde_json::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::UnsupportedContainer { declared } => write!(
                f,
                "Unsupported container type: '{}' (expected {})",
                declared,
                crate::container::UFDR_EXTENSION
            ),
            ExtractError::Io(e) => write!(f, "I/O error: {}", e),
            ExtractError::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Io(e) => Some(e),
            ExtractError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExtractError {
    fn from(err: io::Error) -> Self {
        ExtractError::Io(err)
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        ExtractError::Config(err)
    }
}

/// Recoverable failure scoped to one artifact, table or document
#[derive(Debug)]
pub enum ArtifactError {
    Zip(zip::result::ZipError),
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Xml(quick_xml::Error),
    Io(io::Error),
    /// Entry exceeds the configured size limit
    TooLarge { size: u64, limit: u64 },
    /// Content did not match the shape a strategy expects
    Unrecognized(String),
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::Zip(e) => write!(f, "archive error: {}", e),
            ArtifactError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            ArtifactError::Csv(e) => write!(f, "CSV error: {}", e),
            ArtifactError::Json(e) => write!(f, "JSON error: {}", e),
            ArtifactError::Xml(e) => write!(f, "XML error: {}", e),
            ArtifactError::Io(e) => write!(f, "I/O error: {}", e),
            ArtifactError::TooLarge { size, limit } => {
                write!(f, "entry is {} bytes, limit is {} bytes", size, limit)
            }
            ArtifactError::Unrecognized(e) => write!(f, "unrecognized content: {}", e),
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactError::Zip(e) => Some(e),
            ArtifactError::Sqlite(e) => Some(e),
            ArtifactError::Csv(e) => Some(e),
            ArtifactError::Json(e) => Some(e),
            ArtifactError::Xml(e) => Some(e),
            ArtifactError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for ArtifactError {
    fn from(err: zip::result::ZipError) -> Self {
        ArtifactError::Zip(err)
    }
}

impl From<rusqlite::Error> for ArtifactError {
    fn from(err: rusqlite::Error) -> Self {
        ArtifactError::Sqlite(err)
    }
}

impl From<csv::Error> for ArtifactError {
    fn from(err: csv::Error) -> Self {
        ArtifactError::Csv(err)
    }
}

impl From<serde_json::Error> for ArtifactError {
    fn from(err: serde_json::Error) -> Self {
        ArtifactError::Json(err)
    }
}

impl From<quick_xml::Error> for ArtifactError {
    fn from(err: quick_xml::Error) -> Self {
        ArtifactError::Xml(err)
    }
}

impl From<io::Error> for ArtifactError {
    fn from(err: io::Error) -> Self {
        ArtifactError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_container_message() {
        let err = ExtractError::UnsupportedContainer { declared: ".zip".to_string() };
        let msg = err.to_string();
        assert!(msg.contains(".zip"));
        assert!(msg.contains(".ufdr"));
    }

    #[test]
    fn test_artifact_error_too_large() {
        let err = ArtifactError::TooLarge { size: 10, limit: 5 };
        assert_eq!(err.to_string(), "entry is 10 bytes, limit is 5 bytes");
    }
}
