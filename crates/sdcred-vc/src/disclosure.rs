//! # Disclosure Digests
//!
//! Salted per-claim commitments. A disclosure is the JSON array
//! `[salt, key, value]`, encoded as
//!
//! ```text
//! token  = base64url(JCS([salt, key, value]))
//! digest = base64url(SHA-256(ASCII(token)))
//! ```
//!
//! Only `digest` goes into the signed payload. The holder keeps `token` and
//! reveals it to prove the claim.
//!
//! ## Security Invariant
//!
//! - Digests are computed over the token exactly as transmitted. A verifier
//!   never re-encodes a received disclosure, so issuer and verifier cannot
//!   disagree on whitespace or member order.
//! - Salts are 128 bits from the OS CSPRNG (`sdcred_crypto::generate_salt`).

use base64ct::{Base64UrlUnpadded, Encoding};
use sdcred_core::{sha256_token_digest, CanonicalBytes};
use serde_json::Value;

use crate::error::CredentialError;

/// One decoded disclosure together with its wire token.
#[derive(Debug, Clone, PartialEq)]
pub struct Disclosure {
    salt: String,
    key: String,
    value: Value,
    encoded: String,
}

/// Output of [`commit`]: the salt, the digest to embed and the disclosure
/// the holder keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct Commitment {
    /// The random salt.
    pub salt: String,
    /// base64url SHA-256 of the disclosure token.
    pub digest: String,
    /// The disclosure, including its wire token.
    pub disclosure: Disclosure,
}

/// Commit to a claim under a fresh random salt.
///
/// # Errors
///
/// Returns `CredentialError::Encoding` if the value cannot be canonicalized.
pub fn commit(key: &str, value: &Value) -> Result<Commitment, CredentialError> {
    let salt = sdcred_crypto::generate_salt();
    let disclosure = Disclosure::new(salt.clone(), key, value.clone())?;
    Ok(Commitment {
        salt,
        digest: disclosure.digest(),
        disclosure,
    })
}

/// Recompute the digest of a disclosure token as received.
pub fn recompute(token: &str) -> String {
    sha256_token_digest(token).to_base64url()
}

/// A digest of random data, indistinguishable from a real one.
pub fn decoy_digest() -> String {
    recompute(&sdcred_crypto::generate_salt())
}

impl Disclosure {
    /// Encode `[salt, key, value]` into a disclosure.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Encoding` if the value cannot be canonicalized.
    pub fn new(
        salt: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Self, CredentialError> {
        let salt = salt.into();
        let key = key.into();
        let canonical = CanonicalBytes::new(&serde_json::json!([salt, key, value]))?;
        let encoded = Base64UrlUnpadded::encode_string(canonical.as_bytes());
        Ok(Self {
            salt,
            key,
            value,
            encoded,
        })
    }

    /// Decode a disclosure token. The original token is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Encoding` unless the token is base64url of
    /// a JSON array `[string, string, any]`.
    pub fn decode(token: &str) -> Result<Self, CredentialError> {
        let bytes = Base64UrlUnpadded::decode_vec(token)
            .map_err(|e| CredentialError::Encoding(format!("disclosure is not base64url: {e}")))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CredentialError::Encoding(format!("disclosure is not JSON: {e}")))?;
        let Value::Array(mut items) = value else {
            return Err(CredentialError::Encoding("disclosure is not a JSON array".into()));
        };
        if items.len() != 3 {
            return Err(CredentialError::Encoding(format!(
                "disclosure must have 3 elements, got {}",
                items.len()
            )));
        }
        let claim_value = items.pop().unwrap_or(Value::Null);
        let (Some(Value::String(key)), Some(Value::String(salt))) = (items.pop(), items.pop())
        else {
            return Err(CredentialError::Encoding(
                "disclosure salt and key must be strings".into(),
            ));
        };
        Ok(Self {
            salt,
            key,
            value: claim_value,
            encoded: token.to_string(),
        })
    }

    /// The salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The claim name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The claim value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The wire token.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Digest of the wire token.
    pub fn digest(&self) -> String {
        recompute(&self.encoded)
    }
}
