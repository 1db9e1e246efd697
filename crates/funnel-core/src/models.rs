use sha2::{Digest, Sha256};

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
///
/// Used to derive stable item keys from URLs.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
