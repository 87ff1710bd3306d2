//! Cache key derivation — the determinism the whole cache depends on.
//!
//! Each input text is trimmed, lowercased, and digested independently with
//! SHA-256; the key is the ordered (resume, jd) digest pair. Internal
//! whitespace and punctuation are NOT normalized, so two texts differing only
//! in internal formatting produce different keys. Known limitation, not a bug.

use sha2::{Digest, Sha256};

/// Composite cache key for one (resumeText, jobDescText) content pair.
/// Ordered — swapping the two texts yields a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resume_hash: String,
    pub jd_hash: String,
}

/// Derives the composite key for an input pair. Deterministic, no salt.
pub fn derive_key(resume_text: &str, jd_text: &str) -> CacheKey {
    CacheKey {
        resume_hash: digest_text(resume_text),
        jd_hash: digest_text(jd_text),
    }
}

/// Trim + lowercase, then SHA-256 as a 64-char hex digest.
fn digest_text(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_input_identical_key() {
        let a = derive_key("senior rust engineer resume", "backend role");
        let b = derive_key("senior rust engineer resume", "backend role");
        assert_eq!(a, b);
    }

    #[test]
    fn test_swapped_texts_different_key() {
        let original = derive_key("text one", "text two");
        let swapped = derive_key("text two", "text one");
        assert_ne!(original, swapped);
        // The digests themselves cross over; only the pair order differs.
        assert_eq!(original.resume_hash, swapped.jd_hash);
        assert_eq!(original.jd_hash, swapped.resume_hash);
    }

    #[test]
    fn test_case_and_edge_whitespace_insensitive() {
        let a = derive_key("  Rust Engineer  \n", "\tBackend Role ");
        let b = derive_key("rust engineer", "backend role");
        assert_eq!(a, b);
    }

    #[test]
    fn test_internal_whitespace_sensitive() {
        let a = derive_key("rust engineer", "backend role");
        let b = derive_key("rust  engineer", "backend role");
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_is_64_hex_chars() {
        let key = derive_key("resume", "jd");
        assert_eq!(key.resume_hash.len(), 64);
        assert_eq!(key.jd_hash.len(), 64);
        assert!(key.resume_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
