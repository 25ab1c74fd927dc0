//! Hash computation for catalogued evidence
//!
//! - MD5: legacy, still what most tools print next to a file
//! - SHA-256: NIST approved, court-accepted forensic standard

use md5::Md5;
use sha2::{Digest, Sha256};

// =============================================================================
// Hash Algorithm Enum
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
}

// =============================================================================
// One-shot Hash Computation
// =============================================================================

/// Compute a lowercase hex digest of in-memory data
pub fn compute_hash(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
    }
}
