//! # Claims and the Disclosure Partition
//!
//! A [`Claim`] records whether it is selectively disclosable, so the
//! visible/disclosable split is a field of the data rather than a runtime
//! wrapper. A [`ClaimSet`] keeps claims in insertion order and enforces
//! unique, non-reserved keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CredentialError;

/// Claim names that carry protocol meaning in the signed payload and can
/// never be used as user claims.
pub const RESERVED_CLAIMS: &[&str] = &[
    "iss", "sub", "aud", "iat", "exp", "nbf", "cnf", "_sd", "_sd_alg", "...",
];

/// Whether `key` is reserved for the protocol.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_CLAIMS.contains(&key)
}

/// A single claim about the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim name.
    pub key: String,
    /// Claim value, any JSON.
    pub value: Value,
    /// `true` if the claim is committed as a digest and revealed only on
    /// request; `false` if it appears in the signed payload in the clear.
    pub disclosable: bool,
}

impl Claim {
    /// A selectively disclosable claim.
    pub fn disclosable(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            disclosable: true,
        }
    }

    /// An always-visible claim.
    pub fn visible(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            disclosable: false,
        }
    }
}

/// An ordered set of claims with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    /// An empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Encoding` if the key is empty, reserved,
    /// or already present (in either partition).
    pub fn insert(&mut self, claim: Claim) -> Result<(), CredentialError> {
        if claim.key.is_empty() {
            return Err(CredentialError::Encoding("claim key must not be empty".into()));
        }
        if is_reserved(&claim.key) {
            return Err(CredentialError::Encoding(format!(
                "claim key \"{}\" is reserved",
                claim.key
            )));
        }
        if self.get(&claim.key).is_some() {
            return Err(CredentialError::Encoding(format!(
                "claim key \"{}\" appears more than once",
                claim.key
            )));
        }
        self.claims.push(claim);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, claim: Claim) -> Result<Self, CredentialError> {
        self.insert(claim)?;
        Ok(self)
    }

    /// Partition a claim map: keys in `always_visible` stay in the clear,
    /// every other claim is selectively disclosable.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Encoding` if an always-visible key is not
    /// among the claims, or any key is reserved.
    pub fn from_partition(
        claims: &Map<String, Value>,
        always_visible: &[&str],
    ) -> Result<Self, CredentialError> {
        if let Some(missing) = always_visible.iter().find(|k| !claims.contains_key(**k)) {
            return Err(CredentialError::Encoding(format!(
                "always-visible key \"{missing}\" is not among the claims"
            )));
        }
        let mut set = Self::new();
        for (key, value) in claims {
            let disclosable = !always_visible.contains(&key.as_str());
            set.insert(Claim {
                key: key.clone(),
                value: value.clone(),
                disclosable,
            })?;
        }
        Ok(set)
    }

    /// Build from two separate maps.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Encoding` if a key appears in both maps.
    pub fn from_maps(
        visible: &Map<String, Value>,
        disclosable: &Map<String, Value>,
    ) -> Result<Self, CredentialError> {
        let mut set = Self::new();
        for (key, value) in visible {
            set.insert(Claim::visible(key.clone(), value.clone()))?;
        }
        for (key, value) in disclosable {
            if visible.contains_key(key) {
                return Err(CredentialError::Encoding(format!(
                    "claim key \"{key}\" is both always-visible and disclosable"
                )));
            }
            set.insert(Claim::disclosable(key.clone(), value.clone()))?;
        }
        Ok(set)
    }

    /// Look up a claim by key.
    pub fn get(&self, key: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.key == key)
    }

    /// All claims in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    /// Number of claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether there are no claims.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
