//! # Trust Registry
//!
//! Issuer identity to trusted Ed25519 key. Populated at startup (usually
//! from [`VerifierConfig`](crate::config::VerifierConfig)) and read on every
//! verification.
//!
//! Cloning shares the underlying map. The lock is `parking_lot`, so a
//! panicking writer cannot poison it, and it is never held across anything
//! but a map operation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sdcred_core::{IssuerId, Timestamp};
use sdcred_crypto::Ed25519PublicKey;
use sdcred_vc::{IssuerKeyResolver, VerificationError};
use serde::{Deserialize, Serialize};

use crate::config::TrustedIssuerConfig;

/// A trusted issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerRecord {
    pub issuer_id: IssuerId,
    pub public_key: Ed25519PublicKey,
    /// Human-readable name for listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub registered_at: Timestamp,
}

/// Thread-safe issuer registry.
#[derive(Debug, Clone, Default)]
pub struct TrustRegistry {
    records: Arc<RwLock<HashMap<IssuerId, IssuerRecord>>>,
}

impl TrustRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration entries.
    pub fn from_config(issuers: &[TrustedIssuerConfig]) -> Self {
        let registry = Self::new();
        for entry in issuers {
            registry.register(entry.issuer.clone(), entry.public_key.clone(), entry.label.clone());
        }
        registry
    }

    /// Trust `issuer_id` with `public_key`, replacing any earlier key.
    /// Returns the replaced record.
    pub fn register(
        &self,
        issuer_id: IssuerId,
        public_key: Ed25519PublicKey,
        label: Option<String>,
    ) -> Option<IssuerRecord> {
        let record = IssuerRecord {
            issuer_id: issuer_id.clone(),
            public_key,
            label,
            registered_at: Timestamp::now(),
        };
        let previous = self.records.write().insert(issuer_id.clone(), record);
        tracing::info!(
            issuer = %issuer_id,
            rotated = previous.is_some(),
            "registered trusted issuer"
        );
        previous
    }

    /// Stop trusting `issuer_id`.
    pub fn remove(&self, issuer_id: &IssuerId) -> Option<IssuerRecord> {
        let removed = self.records.write().remove(issuer_id);
        if removed.is_some() {
            tracing::info!(issuer = %issuer_id, "removed trusted issuer");
        }
        removed
    }

    /// The trusted key for `issuer_id`.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::UntrustedIssuer` listing the trusted
    /// issuers when `issuer_id` is not registered.
    pub fn resolve(&self, issuer_id: &IssuerId) -> Result<Ed25519PublicKey, VerificationError> {
        if let Some(record) = self.records.read().get(issuer_id) {
            return Ok(record.public_key.clone());
        }
        Err(VerificationError::UntrustedIssuer {
            issuer_id: issuer_id.to_string(),
            expected: self.issuer_ids().iter().map(ToString::to_string).collect(),
        })
    }

    pub fn get(&self, issuer_id: &IssuerId) -> Option<IssuerRecord> {
        self.records.read().get(issuer_id).cloned()
    }

    pub fn contains(&self, issuer_id: &IssuerId) -> bool {
        self.records.read().contains_key(issuer_id)
    }

    /// All records, sorted by issuer id.
    pub fn list(&self) -> Vec<IssuerRecord> {
        let mut records: Vec<IssuerRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.issuer_id.cmp(&b.issuer_id));
        records
    }

    /// Trusted issuer ids, sorted.
    pub fn issuer_ids(&self) -> Vec<IssuerId> {
        let mut ids: Vec<IssuerId> = self.records.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IssuerKeyResolver for TrustRegistry {
    fn resolve_issuer(&self, issuer: &IssuerId) -> Result<Ed25519PublicKey, VerificationError> {
        self.resolve(issuer)
    }
}
