//! # Credential Error Taxonomy
//!
//! Two error enums with different propagation rules:
//!
//! - [`CredentialError`] covers issuance, presentation and registry setup.
//!   These are integration bugs on the issuer or holder side and propagate
//!   as hard failures.
//! - [`VerificationError`] covers every rejection the verification pipeline
//!   can produce. Verification never fails any other way: each variant maps
//!   to a stable machine-readable [`code`](VerificationError::code).
//!
//! ## Security Invariant
//!
//! [`VerificationError::client_message`] never exposes the detail carried by
//! `Internal`. That detail is for the operator log only.

use sdcred_crypto::CryptoError;
use thiserror::Error;

/// Errors from issuing credentials, building presentations and managing the
/// format registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No codec is registered under the requested format name.
    #[error("unsupported credential format \"{requested}\" (supported: {})", .supported.join(", "))]
    UnsupportedFormat {
        /// The name that was asked for.
        requested: String,
        /// Names currently registered.
        supported: Vec<String>,
    },

    /// A codec is already registered under this name.
    #[error("credential format \"{0}\" is already registered")]
    DuplicateFormat(String),

    /// Claims or tokens could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A requested disclosure was never committed at issuance.
    #[error("claim \"{0}\" was not committed at issuance")]
    UnknownClaim(String),

    /// The credential is bound to a holder key but no holder signing key
    /// was supplied.
    #[error("credential requires holder binding but no holder signing key was supplied")]
    BindingKeyMissing,

    /// The signing capability or another internal component failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CredentialError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::DuplicateFormat(_) => "DUPLICATE_FORMAT",
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::UnknownClaim(_) => "UNKNOWN_CLAIM",
            Self::BindingKeyMissing => "BINDING_KEY_MISSING",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CryptoError> for CredentialError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::SigningFailed(msg) => Self::Internal(msg),
            other => Self::Encoding(other.to_string()),
        }
    }
}

impl From<sdcred_core::CanonicalizationError> for CredentialError {
    fn from(err: sdcred_core::CanonicalizationError) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Reasons a presentation is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No codec is registered under the requested format name.
    #[error("unsupported credential format \"{requested}\" (supported: {})", .supported.join(", "))]
    UnsupportedFormat {
        /// The name that was asked for.
        requested: String,
        /// Names currently registered.
        supported: Vec<String>,
    },

    /// The wire string is structurally invalid.
    #[error("malformed presentation: {0}")]
    MalformedPresentation(String),

    /// The issuer is not trusted, or is not the issuer this verifier expects.
    #[error("issuer \"{issuer_id}\" is not trusted (expected: {})", .expected.join(", "))]
    UntrustedIssuer {
        /// The `iss` value found in the credential.
        issuer_id: String,
        /// Issuers that would have been accepted.
        expected: Vec<String>,
    },

    /// The issuer signature does not verify.
    #[error("issuer signature is invalid: {0}")]
    SignatureInvalid(String),

    /// A disclosure does not match an unused digest in the signed payload.
    #[error("disclosure mismatch: {0}")]
    DisclosureMismatch(String),

    /// The credential is holder-bound but no binding proof was presented.
    #[error("holder binding proof is missing")]
    HolderBindingMissing,

    /// The holder binding proof does not verify.
    #[error("holder binding proof is invalid: {0}")]
    HolderBindingInvalid(String),

    /// The presentation was addressed to a different audience.
    #[error("audience mismatch: expected \"{expected}\", got {}", describe_audience(.actual))]
    AudienceMismatch {
        /// The audience this verifier expects.
        expected: String,
        /// The audience bound into the presentation, if any.
        actual: Option<String>,
    },

    /// The credential is outside its validity window.
    #[error("credential is not within its validity window: {0}")]
    CredentialExpired(String),

    /// The nonce was never issued by this verifier.
    #[error("nonce was not issued by this verifier")]
    NonceNotFound,

    /// The nonce expired before it was used.
    #[error("nonce has expired")]
    NonceExpired,

    /// The nonce was already consumed by an earlier presentation.
    #[error("nonce has already been used")]
    NonceAlreadyUsed,

    /// An unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

fn describe_audience(actual: &Option<String>) -> String {
    match actual {
        Some(aud) => format!("\"{aud}\""),
        None => "none".to_string(),
    }
}

impl VerificationError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::MalformedPresentation(_) => "MALFORMED_PRESENTATION",
            Self::UntrustedIssuer { .. } => "UNTRUSTED_ISSUER",
            Self::SignatureInvalid(_) => "SIGNATURE_INVALID",
            Self::DisclosureMismatch(_) => "DISCLOSURE_MISMATCH",
            Self::HolderBindingMissing => "HOLDER_BINDING_MISSING",
            Self::HolderBindingInvalid(_) => "HOLDER_BINDING_INVALID",
            Self::AudienceMismatch { .. } => "AUDIENCE_MISMATCH",
            Self::CredentialExpired(_) => "CREDENTIAL_EXPIRED",
            Self::NonceNotFound => "NONCE_NOT_FOUND",
            Self::NonceExpired => "NONCE_EXPIRED",
            Self::NonceAlreadyUsed => "NONCE_ALREADY_USED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to the presenting party.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this is an internal failure rather than a rejection of the
    /// presented data.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
