//! SHA-256 checksums of descriptor files.
//!
//! The persisted module state records the checksum of the descriptor that was
//! last applied, so the format (`sha256:<hex>`) must stay stable.

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Checksum of raw descriptor bytes, as `"sha256:<hex>"`.
pub fn descriptor_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value() {
        assert_eq!(
            descriptor_checksum(b"hello world"),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn differs_per_content() {
        assert_ne!(descriptor_checksum(b"{'a': 1}"), descriptor_checksum(b"{'a': 2}"));
    }
}
