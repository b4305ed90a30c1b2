//! Storage key derivation.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex width of a full SHA-256 digest.
pub const MAX_FINGERPRINT_LENGTH: usize = 64;
pub const DEFAULT_FINGERPRINT_LENGTH: usize = 32;

/// Fixed-length lowercase hex key derived from a request key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    pub hash: String,
    pub namespace: Option<String>,
}

impl StorageKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Key as handed to the blob store (`namespace/hash` when namespaced).
    pub fn to_store_key(&self) -> String {
        match self.namespace {
            Some(ref ns) => format!("{}/{}", ns, self.hash),
            None => self.hash.clone(),
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_store_key())
    }
}

/// Check that `length` is even and fits within the digest.
pub fn validate_length(length: usize) -> Result<()> {
    if length == 0 || length % 2 != 0 || length > MAX_FINGERPRINT_LENGTH {
        return Err(Error::configuration_with_context(
            "fingerprint length must be an even number between 2 and 64",
            ErrorContext::new()
                .with_field_path("fingerprint_length")
                .with_details(length.to_string())
                .with_source("fingerprint"),
        ));
    }
    Ok(())
}

/// SHA-256 over the UTF-8 bytes of `input`, rendered as lowercase hex and
/// truncated to `length` characters.
pub fn fingerprint(input: &str, length: usize) -> Result<String> {
    validate_length(length)?;
    let digest = Sha256::digest(input.as_bytes());
    // each byte renders as two hex chars, so only the leading length/2 bytes are needed
    let hash: String = digest[..length / 2]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    Ok(hash)
}

/// Derives namespaced storage keys with a fixed fingerprint length.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    length: usize,
}

impl KeyGenerator {
    pub fn new(length: usize) -> Result<Self> {
        validate_length(length)?;
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate(&self, namespace: &str, request_key: &str) -> StorageKey {
        // length was validated in `new`
        let hash = fingerprint(request_key, self.length).unwrap_or_default();
        StorageKey::new(hash).with_namespace(namespace)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_FINGERPRINT_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_known_vector() {
        // sha256("abc")
        let full = fingerprint("abc", 64).unwrap();
        assert_eq!(
            full,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fingerprint("abc", 32).unwrap(), &full[..32]);
    }

    #[test]
    fn test_fingerprint_deterministic_and_fixed_length() {
        for input in ["a cat", "sunset over mountains", "日本語のプロンプト", "\u{0}\t\n", "x"] {
            let a = fingerprint(input, DEFAULT_FINGERPRINT_LENGTH).unwrap();
            let b = fingerprint(input, DEFAULT_FINGERPRINT_LENGTH).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.len(), DEFAULT_FINGERPRINT_LENGTH);
            assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_fingerprint_distinguishes_inputs() {
        assert_ne!(
            fingerprint("a cat", 32).unwrap(),
            fingerprint("a dog", 32).unwrap()
        );
    }

    #[test]
    fn test_invalid_lengths_rejected() {
        for length in [0, 3, 31, 66, 128] {
            let err = fingerprint("abc", length).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }));
        }
        assert!(KeyGenerator::new(17).is_err());
    }

    #[test]
    fn test_key_generator_namespaces() {
        let generator = KeyGenerator::new(16).unwrap();
        let image = generator.generate("image", "a cat");
        let text = generator.generate("text", "a cat");
        assert_eq!(image.hash, text.hash);
        assert_ne!(image.to_store_key(), text.to_store_key());
        assert!(image.to_store_key().starts_with("image/"));
        assert_eq!(image.hash.len(), 16);
    }
}
