//! # Content Digest
//!
//! Defines `ContentDigest` and `DigestAlgorithm`, the hash values that stand
//! in for selectively disclosable claims inside a signed credential.
//!
//! Two computation paths exist, and both are deliberately narrow:
//!
//! - [`sha256_digest()`] hashes `CanonicalBytes` (JSON values).
//! - [`sha256_token_digest()`] hashes the ASCII bytes of an already-encoded
//!   compact token (a disclosure or an SD-JWT prefix). The token string is
//!   hashed exactly as transmitted, so the verifier never re-encodes
//!   anything before comparing.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    #[serde(rename = "sha-256")]
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the IANA hash name used in `_sd_alg`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha-256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a new content digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as unpadded base64url, the form carried in `_sd`
    /// and `sd_hash`.
    pub fn to_base64url(&self) -> String {
        Base64UrlUnpadded::encode_string(&self.bytes)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_base64url())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    sha256_of(data.as_bytes())
}

/// Compute a SHA-256 digest over the ASCII bytes of a compact token.
///
/// Used for disclosure digests and the key-binding `sd_hash`. The input is
/// the token text exactly as it appears on the wire.
pub fn sha256_token_digest(token: &str) -> ContentDigest {
    sha256_of(token.as_bytes())
}

fn sha256_of(bytes: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest_deterministic() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
    }

    #[test]
    fn test_known_sha256_vector() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        let digest = sha256_digest(&cb);
        assert_eq!(
            digest.to_base64url(),
            "RBNvo1WzZ4oRRq0W9-hknpT7T8If536DEMBg9hyq_4o"
        );
    }

    #[test]
    fn test_token_digest_matches_published_sd_jwt_vector() {
        // Disclosure for ["_26bc4LT-ac6q2KI6cBW5es", "family_name", "Möbius"].
        let token = "WyJfMjZiYzRMVC1hYzZxMktJNmNCVzVlcyIsImZhbWlseV9uYW1lIiwiTcO2Yml1cyJd";
        assert_eq!(
            sha256_token_digest(token).to_base64url(),
            "TZjouOTrBKEwUNjNDs9yeMzBoQn8FFLPaJjRRmAtwrM"
        );
    }

    #[test]
    fn test_different_inputs_different_digests() {
        assert_ne!(sha256_token_digest("abc"), sha256_token_digest("abd"));
    }

    #[test]
    fn test_content_digest_display() {
        let s = sha256_token_digest("x").to_string();
        assert!(s.starts_with("sha-256:"));
        assert_eq!(s.len(), 8 + 43);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(DigestAlgorithm::Sha256.as_str(), "sha-256");
        assert!(serde_json::from_str::<DigestAlgorithm>("\"sha-512\"").is_err());
        assert_eq!(
            serde_json::to_string(&DigestAlgorithm::Sha256).unwrap(),
            "\"sha-256\""
        );
    }
}
