//! # Compact JSON Web Signatures
//!
//! The signing capability the credential protocol is built on:
//! `sign(payload) -> token` and `verify(token, key) -> payload`. Tokens use
//! the JWS compact serialization (RFC 7515 §7.1):
//!
//! ```text
//! base64url(header) "." base64url(payload) "." base64url(signature)
//! ```
//!
//! Header and payload JSON are produced by [`CanonicalBytes`], so the same
//! claims always produce the same token bytes for a given key. Only `EdDSA`
//! over Ed25519 is implemented.

use base64ct::{Base64UrlUnpadded, Encoding};
use sdcred_core::CanonicalBytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ed25519::{verify_message, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;
use crate::jwk::PublicJwk;

/// JWS signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JwsAlgorithm {
    /// Edwards-curve signatures (RFC 8037), Ed25519 only.
    #[serde(rename = "EdDSA")]
    EdDsa,
}

/// Protected JWS header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm.
    pub alg: JwsAlgorithm,
    /// Media type of the complete token (`sd+jwt`, `kb+jwt`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Key identifier hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Critical extensions. None are understood, so any value is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Vec<String>>,
}

/// The ASCII string `base64url(header).base64url(payload)` that a signer
/// signs. Only constructible by [`encode`] and [`decode_unverified`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInput(String);

impl SigningInput {
    /// The bytes to sign or verify.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A capability that signs JWS signing input with a private key.
///
/// Implementations may wrap an in-process key, an HSM or a remote signer.
pub trait TokenSigner: Send + Sync {
    /// The algorithm placed in the `alg` header.
    fn algorithm(&self) -> JwsAlgorithm;

    /// Optional `kid` placed in the header.
    fn key_id(&self) -> Option<String> {
        None
    }

    /// The public half of the signing key, as a JWK.
    fn public_jwk(&self) -> PublicJwk;

    /// Produce the raw signature bytes over the signing input.
    fn sign_input(&self, input: &SigningInput) -> Result<Vec<u8>, CryptoError>;
}

impl TokenSigner for Ed25519KeyPair {
    fn algorithm(&self) -> JwsAlgorithm {
        JwsAlgorithm::EdDsa
    }

    fn public_jwk(&self) -> PublicJwk {
        PublicJwk::from_public_key(&self.public_key())
    }

    fn sign_input(&self, input: &SigningInput) -> Result<Vec<u8>, CryptoError> {
        Ok(self.sign_message(input.as_bytes()).0.to_vec())
    }
}

/// Sign `claims` into a compact JWS with the given `typ` header.
///
/// # Errors
///
/// Returns `CryptoError::Canonicalization` if header or claims cannot be
/// serialized, or `CryptoError::SigningFailed` if the signer fails.
pub fn encode(
    typ: &str,
    claims: &impl Serialize,
    signer: &dyn TokenSigner,
) -> Result<String, CryptoError> {
    let header = JwsHeader {
        alg: signer.algorithm(),
        typ: Some(typ.to_string()),
        kid: signer.key_id(),
        crit: None,
    };
    let header_b64 = Base64UrlUnpadded::encode_string(CanonicalBytes::new(&header)?.as_bytes());
    let payload_b64 = Base64UrlUnpadded::encode_string(CanonicalBytes::new(claims)?.as_bytes());
    let input = SigningInput(format!("{header_b64}.{payload_b64}"));

    let signature = signer.sign_input(&input)?;
    if signature.is_empty() {
        return Err(CryptoError::SigningFailed("signer returned an empty signature".into()));
    }
    Ok(format!("{}.{}", input.0, Base64UrlUnpadded::encode_string(&signature)))
}

/// A compact JWS whose structure has been parsed but whose signature has
/// not yet been checked.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    /// Protected header.
    pub header: JwsHeader,
    /// Payload claims. Always a JSON object.
    pub claims: serde_json::Value,
    signing_input: SigningInput,
    signature: Vec<u8>,
}

impl DecodedToken {
    /// Check the signature against `key`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::VerificationFailed` on any mismatch.
    pub fn verify(&self, key: &Ed25519PublicKey) -> Result<(), CryptoError> {
        let signature = Ed25519Signature::from_slice(&self.signature)?;
        verify_message(self.signing_input.as_bytes(), &signature, key)
    }

    /// Deserialize the claims into a typed payload.
    pub fn claims_as<T: DeserializeOwned>(&self) -> Result<T, CryptoError> {
        serde_json::from_value(self.claims.clone())
            .map_err(|e| CryptoError::MalformedToken(format!("unexpected claims shape: {e}")))
    }
}

/// Parse a compact JWS without checking its signature.
///
/// Needed to read `iss` before the issuer key can be looked up. Callers
/// must call [`DecodedToken::verify`] before trusting any claim.
///
/// # Errors
///
/// Returns `CryptoError::MalformedToken` for structural problems and
/// `CryptoError::UnsupportedAlgorithm` when `alg` is not `EdDSA`.
pub fn decode_unverified(token: &str) -> Result<DecodedToken, CryptoError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
        return Err(CryptoError::MalformedToken(format!(
            "expected 3 dot-separated segments, got {}",
            parts.len()
        )));
    };
    if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
        return Err(CryptoError::MalformedToken("empty token segment".into()));
    }

    let header_bytes = decode_segment("header", header_b64)?;
    let header_value: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::MalformedToken(format!("header is not JSON: {e}")))?;
    if let Some(alg) = header_value.get("alg").and_then(|a| a.as_str()) {
        if alg != "EdDSA" {
            return Err(CryptoError::UnsupportedAlgorithm(alg.to_string()));
        }
    }
    let header: JwsHeader = serde_json::from_value(header_value)
        .map_err(|e| CryptoError::MalformedToken(format!("invalid header: {e}")))?;
    if header.crit.is_some() {
        return Err(CryptoError::MalformedToken(
            "critical header extensions are not supported".into(),
        ));
    }

    let payload_bytes = decode_segment("payload", payload_b64)?;
    let claims: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| CryptoError::MalformedToken(format!("payload is not JSON: {e}")))?;
    if !claims.is_object() {
        return Err(CryptoError::MalformedToken("payload must be a JSON object".into()));
    }

    let signature = decode_segment("signature", signature_b64)?;

    Ok(DecodedToken {
        header,
        claims,
        signing_input: SigningInput(format!("{header_b64}.{payload_b64}")),
        signature,
    })
}

/// Parse and verify a compact JWS in one step.
pub fn decode(token: &str, key: &Ed25519PublicKey) -> Result<DecodedToken, CryptoError> {
    let decoded = decode_unverified(token)?;
    decoded.verify(key)?;
    Ok(decoded)
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, CryptoError> {
    Base64UrlUnpadded::decode_vec(segment)
        .map_err(|e| CryptoError::MalformedToken(format!("{name} is not base64url: {e}")))
}
