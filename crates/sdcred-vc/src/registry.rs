//! # Format Registry
//!
//! Maps format names to [`CredentialCodec`] instances. Built once at
//! startup and then shared read-only, so it needs no lock: registration
//! takes `&mut self`, dispatch takes `&self`.
//!
//! The registry also carries the stateless programmatic surface
//! (`generate_keys`, `issue`, `create_presentation`, `verify`). Verification
//! here checks the nonce bound into the proof but keeps no ledger; replay
//! protection lives in the verifier crate.

use std::collections::BTreeMap;
use std::sync::Arc;

use sdcred_core::Timestamp;
use sdcred_crypto::TokenSigner;
use serde_json::{Map, Value};

use crate::claims::ClaimSet;
use crate::codec::{CredentialCodec, KeyBundle, SdJwtCodec};
use crate::credential::{Credential, IssuanceRequest};
use crate::error::{CredentialError, VerificationError};
use crate::presentation::HolderBinding;
use crate::verify::{IssuerKeyResolver, VerificationPolicy, VerificationResult};

/// Format name to codec.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    codecs: BTreeMap<String, Arc<dyn CredentialCodec>>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.supported_formats())
            .finish()
    }
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `sd-jwt` codec.
    pub fn with_defaults() -> Self {
        let mut codecs: BTreeMap<String, Arc<dyn CredentialCodec>> = BTreeMap::new();
        codecs.insert(SdJwtCodec::FORMAT.to_string(), Arc::new(SdJwtCodec::new()));
        Self { codecs }
    }

    /// Bind `name` to `codec`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::DuplicateFormat` if `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        codec: Arc<dyn CredentialCodec>,
    ) -> Result<(), CredentialError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CredentialError::Encoding("format name must not be empty".into()));
        }
        if self.codecs.contains_key(&name) {
            return Err(CredentialError::DuplicateFormat(name));
        }
        tracing::info!(format = %name, "registered credential format");
        self.codecs.insert(name, codec);
        Ok(())
    }

    /// Look up the codec for `name`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::UnsupportedFormat` listing the registered
    /// names.
    pub fn dispatch(&self, name: &str) -> Result<&dyn CredentialCodec, CredentialError> {
        match self.codecs.get(name) {
            Some(codec) => Ok(codec.as_ref()),
            None => Err(CredentialError::UnsupportedFormat {
                requested: name.to_string(),
                supported: self.supported_formats(),
            }),
        }
    }

    /// Like [`dispatch`](Self::dispatch), for the verification path.
    pub fn dispatch_for_verification(
        &self,
        name: &str,
    ) -> Result<&dyn CredentialCodec, VerificationError> {
        match self.codecs.get(name) {
            Some(codec) => Ok(codec.as_ref()),
            None => Err(VerificationError::UnsupportedFormat {
                requested: name.to_string(),
                supported: self.supported_formats(),
            }),
        }
    }

    /// Registered names, sorted.
    pub fn supported_formats(&self) -> Vec<String> {
        self.codecs.keys().cloned().collect()
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    // -----------------------------------------------------------------------
    // Stateless surface
    // -----------------------------------------------------------------------

    pub fn generate_keys(&self, format: &str) -> Result<KeyBundle, CredentialError> {
        Ok(self.dispatch(format)?.generate_keys())
    }

    /// Issue a credential. Keys listed in `always_visible` stay in the
    /// clear; every other claim becomes selectively disclosable.
    pub fn issue(
        &self,
        format: &str,
        claims: &Map<String, Value>,
        always_visible: &[&str],
        request: &IssuanceRequest,
        issuer_key: &dyn TokenSigner,
    ) -> Result<Credential, CredentialError> {
        let codec = self.dispatch(format)?;
        let claims = ClaimSet::from_partition(claims, always_visible)?;
        codec.issue(&claims, request, issuer_key)
    }

    /// Build a presentation and return its wire string.
    pub fn create_presentation(
        &self,
        format: &str,
        credential: &Credential,
        disclosed_keys: &[&str],
        binding: Option<HolderBinding<'_>>,
    ) -> Result<String, CredentialError> {
        let codec = self.dispatch(format)?;
        Ok(codec.present(credential, disclosed_keys, binding)?.to_wire())
    }

    /// Verify a wire string without replay protection.
    pub fn verify(
        &self,
        format: &str,
        wire: &str,
        issuers: &dyn IssuerKeyResolver,
        nonce: Option<&str>,
        audience: Option<&str>,
    ) -> VerificationResult {
        let mut policy = VerificationPolicy::new();
        policy.nonce = nonce.map(str::to_string);
        policy.audience = audience.map(str::to_string);
        self.verify_with_policy(format, wire, issuers, &policy, Timestamp::now())
    }

    /// Verify a wire string under an explicit policy and clock.
    pub fn verify_with_policy(
        &self,
        format: &str,
        wire: &str,
        issuers: &dyn IssuerKeyResolver,
        policy: &VerificationPolicy,
        now: Timestamp,
    ) -> VerificationResult {
        let codec = self.dispatch_for_verification(format)?;
        let presentation = codec.parse(wire)?;
        let checked = codec.check(&presentation, issuers, policy, now)?;
        checked.check_validity_window(now, policy.clock_skew_secs)?;
        Ok(checked.into_verified())
    }
}
