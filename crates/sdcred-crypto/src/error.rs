//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `sdcred-crypto`.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing or conversion failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A compact token was structurally invalid (segments, base64url, JSON).
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token header names an algorithm this crate does not implement.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Header or payload could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] sdcred_core::CanonicalizationError),

    /// The signing capability failed to produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}
