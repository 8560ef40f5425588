//! # Ed25519 JSON Web Keys
//!
//! The holder's public key travels inside the credential as
//! `cnf: {"jwk": {...}}` (RFC 7800). Only OKP/Ed25519 keys (RFC 8037) are
//! understood.

use base64ct::{Base64UrlUnpadded, Encoding};
use sdcred_core::{sha256_digest, CanonicalBytes};
use serde::{Deserialize, Serialize};

use crate::ed25519::Ed25519PublicKey;
use crate::error::CryptoError;

/// Key type for Ed25519 keys.
pub const KTY_OKP: &str = "OKP";
/// Curve name for Ed25519 keys.
pub const CRV_ED25519: &str = "Ed25519";

/// A public JWK for an Ed25519 key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    /// Key type, always `OKP`.
    pub kty: String,
    /// Curve, always `Ed25519`.
    pub crv: String,
    /// The base64url-encoded 32-byte public key.
    pub x: String,
}

impl PublicJwk {
    /// Build a JWK from an Ed25519 public key.
    pub fn from_public_key(key: &Ed25519PublicKey) -> Self {
        Self {
            kty: KTY_OKP.to_string(),
            crv: CRV_ED25519.to_string(),
            x: Base64UrlUnpadded::encode_string(key.as_bytes()),
        }
    }

    /// Recover the Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyError` for any key type other than
    /// OKP/Ed25519 or an `x` value that is not 32 bytes of base64url.
    pub fn to_public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        if self.kty != KTY_OKP || self.crv != CRV_ED25519 {
            return Err(CryptoError::KeyError(format!(
                "unsupported JWK kty/crv: {}/{}",
                self.kty, self.crv
            )));
        }
        let bytes = Base64UrlUnpadded::decode_vec(&self.x)
            .map_err(|e| CryptoError::KeyError(format!("invalid JWK x: {e}")))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::KeyError(format!("JWK x must be 32 bytes, got {}", bytes.len()))
        })?;
        let key = Ed25519PublicKey::from_bytes(arr);
        key.to_verifying_key()?;
        Ok(key)
    }

    /// RFC 7638 thumbprint: base64url SHA-256 over the JCS form of the
    /// required members (`crv`, `kty`, `x`).
    pub fn thumbprint(&self) -> Result<String, CryptoError> {
        let members = serde_json::json!({"crv": self.crv, "kty": self.kty, "x": self.x});
        let cb = CanonicalBytes::new(&members)?;
        Ok(sha256_digest(&cb).to_base64url())
    }
}
