// Common utilities shared across artifact extractors

pub mod hash;
pub mod magic;

// Re-exports for convenience
pub use hash::{compute_hash, HashAlgorithm};
pub use magic::{detect, detect_file_type, FileCategory, FileType};
