use sha2::{Digest, Sha256};

/// SHA-256 of raw bytes, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of a UTF-8 string, lowercase hex.
pub fn sha256_hex_str(s: &str) -> String {
    sha256_hex(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_stable() {
        assert_eq!(sha256_hex_str("hello"), sha256_hex_str("hello"));
    }

    #[test]
    fn hex_differs_on_input() {
        assert_ne!(sha256_hex_str("hello"), sha256_hex_str("hellp"));
    }

    #[test]
    fn empty_input_hashes_to_known_digest() {
        assert_eq!(
            sha256_hex_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
