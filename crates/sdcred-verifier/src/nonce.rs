//! # Nonce Ledger
//!
//! Single-use challenges. A nonce is pending from issue until its first
//! successful consume, then consumed for as long as the ledger keeps it.
//!
//! ## Security Invariant
//!
//! `consume` checks and flips the state under one mutex acquisition. Of any
//! number of concurrent `consume` calls for the same pending nonce, exactly
//! one returns `Ok`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sdcred_core::Timestamp;
use sdcred_vc::VerificationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default nonce lifetime.
pub const DEFAULT_NONCE_TTL_SECS: i64 = 300;

/// An issued challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce {
    pub value: String,
    pub expires_at: Timestamp,
}

/// Nonce ledger failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceError {
    #[error("nonce was never issued")]
    NotFound,
    #[error("nonce has expired")]
    Expired,
    #[error("nonce has already been used")]
    AlreadyUsed,
    /// `register` was called with a value the ledger already holds.
    #[error("nonce is already in the ledger")]
    AlreadyIssued,
}

impl From<NonceError> for VerificationError {
    fn from(err: NonceError) -> Self {
        match err {
            NonceError::NotFound => Self::NonceNotFound,
            NonceError::Expired => Self::NonceExpired,
            NonceError::AlreadyUsed => Self::NonceAlreadyUsed,
            NonceError::AlreadyIssued => Self::Internal(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NonceState {
    Pending,
    Consumed,
}

#[derive(Debug, Clone, Copy)]
struct NonceEntry {
    expires_at: Timestamp,
    state: NonceState,
}

/// Thread-safe single-use nonce store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct NonceLedger {
    entries: Arc<Mutex<HashMap<String, NonceEntry>>>,
}

impl NonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh random nonce valid for `ttl_secs`.
    pub fn issue(&self, ttl_secs: i64) -> Nonce {
        self.issue_at(ttl_secs, Timestamp::now())
    }

    pub fn issue_at(&self, ttl_secs: i64, now: Timestamp) -> Nonce {
        let expires_at = now.offset_secs(ttl_secs);
        let mut entries = self.entries.lock();
        let value = loop {
            let candidate = sdcred_crypto::generate_nonce();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        entries.insert(
            value.clone(),
            NonceEntry {
                expires_at,
                state: NonceState::Pending,
            },
        );
        tracing::debug!(expires_at = %expires_at, pending = entries.len(), "issued nonce");
        Nonce { value, expires_at }
    }

    /// Admit a nonce minted elsewhere, valid for `ttl_secs`. A pending
    /// entry that has already expired is replaced.
    ///
    /// # Errors
    ///
    /// Returns `NonceError::AlreadyIssued` if the value is held as consumed
    /// or as pending and unexpired.
    pub fn register(&self, value: impl Into<String>, ttl_secs: i64) -> Result<Nonce, NonceError> {
        self.register_at(value, ttl_secs, Timestamp::now())
    }

    pub fn register_at(
        &self,
        value: impl Into<String>,
        ttl_secs: i64,
        now: Timestamp,
    ) -> Result<Nonce, NonceError> {
        let value = value.into();
        let expires_at = now.offset_secs(ttl_secs);
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&value) {
            let stale = existing.state == NonceState::Pending && now > existing.expires_at;
            if !stale {
                return Err(NonceError::AlreadyIssued);
            }
        }
        entries.insert(
            value.clone(),
            NonceEntry {
                expires_at,
                state: NonceState::Pending,
            },
        );
        tracing::debug!(expires_at = %expires_at, "registered external nonce");
        Ok(Nonce { value, expires_at })
    }

    /// Mark `value` consumed.
    ///
    /// # Errors
    ///
    /// `NotFound` if never issued, `AlreadyUsed` if consumed before,
    /// `Expired` if past its expiry (the entry is then dropped).
    pub fn consume(&self, value: &str) -> Result<(), NonceError> {
        self.consume_at(value, Timestamp::now())
    }

    pub fn consume_at(&self, value: &str, now: Timestamp) -> Result<(), NonceError> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(value).copied() else {
            return Err(NonceError::NotFound);
        };
        if entry.state == NonceState::Consumed {
            return Err(NonceError::AlreadyUsed);
        }
        if now > entry.expires_at {
            entries.remove(value);
            return Err(NonceError::Expired);
        }
        entries.insert(
            value.to_string(),
            NonceEntry {
                state: NonceState::Consumed,
                ..entry
            },
        );
        tracing::debug!("consumed nonce");
        Ok(())
    }

    /// Whether `value` is issued, unconsumed and unexpired at `now`.
    pub fn is_pending(&self, value: &str, now: Timestamp) -> bool {
        self.entries
            .lock()
            .get(value)
            .is_some_and(|e| e.state == NonceState::Pending && now <= e.expires_at)
    }

    /// Drop every entry that expired before `now`, consumed or not.
    /// Returns how many were removed.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at >= now);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = entries.len(), "purged expired nonces");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
