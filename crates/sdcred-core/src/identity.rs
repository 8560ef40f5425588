//! # Identity Newtypes
//!
//! Newtype wrappers for the two parties named inside a credential. They
//! prevent passing a subject where an issuer is expected, which matters
//! because the trust decision is keyed on the issuer alone.
//!
//! Identifiers are opaque: a DID, an HTTPS URL, or any other string an
//! issuer chooses. Validation only rejects values that cannot be compared
//! reliably (empty, whitespace, control characters, oversized).

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Upper bound on identifier length, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 2048;

/// Identity of a credential issuer (the `iss` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IssuerId(String);

/// Identity of a credential subject (the `sub` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl IssuerId {
    /// Create a validated issuer identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        validate("issuer id", value.into()).map(Self)
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SubjectId {
    /// Create a validated subject identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        validate("subject id", value.into()).map(Self)
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(kind: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyIdentifier { kind });
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            kind,
            max: MAX_IDENTIFIER_LEN,
            len: value.len(),
        });
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidCharacters { kind, value });
    }
    Ok(value)
}

impl<'de> Deserialize<'de> for IssuerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for IssuerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
