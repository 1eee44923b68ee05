//! SHA-256 checksums for stored documents
//!
//! Every registry entry records the checksum of the document it points at, in
//! the canonical `sha256:<hex>` format, so a file changed behind the store's
//! back is reported as malformed instead of being loaded.

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Compute the checksum of string content as `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Whether `content` hashes to `expected`.
pub fn verify_content_checksum(content: &str, expected: &str) -> bool {
    compute_content_checksum(content) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_checksum_known_value() {
        assert_eq!(
            compute_content_checksum("hello world"),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn verify_detects_changes() {
        let checksum = compute_content_checksum(r#"{"G2_CONFIG":{}}"#);
        assert!(verify_content_checksum(r#"{"G2_CONFIG":{}}"#, &checksum));
        assert!(!verify_content_checksum(r#"{"G2_CONFIG":{"X":1}}"#, &checksum));
    }
}
