//! # Verification Engine
//!
//! Runs the full pipeline against the trust registry and nonce ledger:
//!
//! 1. parse (codec)
//! 2. issuer signature, key from the [`TrustRegistry`]
//! 3. disclosure digests
//! 4. holder binding
//! 5. audience
//! 6. nonce consumption in the [`NonceLedger`]
//! 7. validity window
//! 8. result assembly
//!
//! Each stage must pass before the next runs; the first failure is
//! returned. The nonce is consumed only after the cryptographic stages
//! pass, so a forged presentation cannot burn a holder's challenge.

use std::sync::Arc;

use sdcred_core::{IssuerId, Timestamp};
use sdcred_vc::verify::{DEFAULT_CLOCK_SKEW_SECS, DEFAULT_MAX_PROOF_AGE_SECS};
use sdcred_vc::{FormatRegistry, VerificationPolicy, VerificationResult};

use crate::config::VerifierConfig;
use crate::nonce::NonceLedger;
use crate::trust::TrustRegistry;

/// Clock tolerances applied to every verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub clock_skew_secs: i64,
    /// Oldest acceptable holder-binding proof. `None` disables the check.
    pub max_proof_age_secs: Option<i64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            max_proof_age_secs: Some(DEFAULT_MAX_PROOF_AGE_SECS),
        }
    }
}

impl From<&VerifierConfig> for EngineSettings {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            clock_skew_secs: config.clock_skew_secs,
            max_proof_age_secs: Some(config.max_proof_age_secs),
        }
    }
}

/// Verifies presentations with replay protection.
///
/// Cheap to clone; clones share the registry, trust and nonce state.
#[derive(Debug, Clone)]
pub struct VerificationEngine {
    formats: Arc<FormatRegistry>,
    trust: TrustRegistry,
    nonces: NonceLedger,
    settings: EngineSettings,
}

impl VerificationEngine {
    pub fn new(formats: Arc<FormatRegistry>, trust: TrustRegistry, nonces: NonceLedger) -> Self {
        Self {
            formats,
            trust,
            nonces,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn trust(&self) -> &TrustRegistry {
        &self.trust
    }

    pub fn nonces(&self) -> &NonceLedger {
        &self.nonces
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Verify `wire` for `expected_audience`, consuming `nonce`.
    pub fn verify(
        &self,
        format: &str,
        wire: &str,
        expected_audience: &str,
        nonce: &str,
    ) -> VerificationResult {
        self.verify_at(format, wire, expected_audience, nonce, Timestamp::now())
    }

    /// [`verify`](Self::verify) against an explicit clock.
    pub fn verify_at(
        &self,
        format: &str,
        wire: &str,
        expected_audience: &str,
        nonce: &str,
        now: Timestamp,
    ) -> VerificationResult {
        let policy = self.policy(expected_audience, nonce);
        self.run(format, wire, &policy, nonce, now)
    }

    /// [`verify`](Self::verify), additionally requiring the credential to
    /// come from `issuer`.
    pub fn verify_from_issuer(
        &self,
        format: &str,
        wire: &str,
        expected_audience: &str,
        nonce: &str,
        issuer: &IssuerId,
    ) -> VerificationResult {
        let policy = self
            .policy(expected_audience, nonce)
            .with_expected_issuer(issuer.clone());
        self.run(format, wire, &policy, nonce, Timestamp::now())
    }

    fn policy(&self, expected_audience: &str, nonce: &str) -> VerificationPolicy {
        VerificationPolicy::new()
            .with_audience(expected_audience)
            .with_nonce(nonce)
            .with_clock_skew(self.settings.clock_skew_secs)
            .with_max_proof_age(self.settings.max_proof_age_secs)
    }

    fn run(
        &self,
        format: &str,
        wire: &str,
        policy: &VerificationPolicy,
        nonce: &str,
        now: Timestamp,
    ) -> VerificationResult {
        let result = self.pipeline(format, wire, policy, nonce, now);
        match &result {
            Ok(verified) => tracing::info!(
                format,
                issuer = %verified.issuer,
                disclosed = verified.claims.len(),
                "presentation verified"
            ),
            Err(err) if err.is_internal() => {
                tracing::error!(format, error = %err, "verification failed internally")
            }
            Err(err) => tracing::warn!(
                format,
                code = err.code(),
                reason = %err,
                "presentation rejected"
            ),
        }
        result
    }

    fn pipeline(
        &self,
        format: &str,
        wire: &str,
        policy: &VerificationPolicy,
        nonce: &str,
        now: Timestamp,
    ) -> VerificationResult {
        let codec = self.formats.dispatch_for_verification(format)?;
        let presentation = codec.parse(wire)?;
        let checked = codec.check(&presentation, &self.trust, policy, now)?;
        self.nonces.consume_at(nonce, now)?;
        checked.check_validity_window(now, policy.clock_skew_secs)?;
        Ok(checked.into_verified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdcred_core::SubjectId;
    use sdcred_crypto::Ed25519KeyPair;
    use sdcred_vc::{Claim, ClaimSet, HolderBinding, IssuanceRequest, SdJwtCodec, CredentialCodec};

    struct Fixture {
        engine: VerificationEngine,
        issuer: Ed25519KeyPair,
        holder: Ed25519KeyPair,
    }

    fn fixture() -> Fixture {
        let issuer = Ed25519KeyPair::generate();
        let trust = TrustRegistry::new();
        trust.register(IssuerId::new("did:example:issuer").unwrap(), issuer.public_key(), None);
        let engine = VerificationEngine::new(
            Arc::new(FormatRegistry::with_defaults()),
            trust,
            NonceLedger::new(),
        );
        Fixture {
            engine,
            issuer,
            holder: Ed25519KeyPair::generate(),
        }
    }

    fn present(f: &Fixture, nonce: &str) -> String {
        let codec = SdJwtCodec::new();
        let claims = ClaimSet::new()
            .with(Claim::disclosable("given_name", "Jon"))
            .unwrap();
        let request = IssuanceRequest::new(IssuerId::new("did:example:issuer").unwrap())
            .with_subject(SubjectId::new("holder-1").unwrap())
            .with_holder_key(&f.holder.public_key());
        let cred = codec.issue(&claims, &request, &f.issuer).unwrap();
        codec
            .present(&cred, &["given_name"], Some(HolderBinding::new(&f.holder, nonce, "verifier-1")))
            .unwrap()
            .to_wire()
    }

    #[test]
    fn nonce_not_burned_by_cryptographic_failure() {
        let f = fixture();
        let nonce = f.engine.nonces().issue(60);
        let wire = present(&f, &nonce.value);

        let err = f
            .engine
            .verify("sd-jwt", &wire, "verifier-2", &nonce.value)
            .unwrap_err();
        assert_eq!(err.code(), "AUDIENCE_MISMATCH");
        assert!(f.engine.nonces().is_pending(&nonce.value, Timestamp::now()));

        assert!(f.engine.verify("sd-jwt", &wire, "verifier-1", &nonce.value).is_ok());
        assert!(!f.engine.nonces().is_pending(&nonce.value, Timestamp::now()));
    }

    #[test]
    fn nonce_must_be_issued_by_this_ledger() {
        let f = fixture();
        let wire = present(&f, "self-made");
        let err = f
            .engine
            .verify("sd-jwt", &wire, "verifier-1", "self-made")
            .unwrap_err();
        assert_eq!(err.code(), "NONCE_NOT_FOUND");
    }

    #[test]
    fn expired_nonce() {
        let f = fixture();
        let issued = Timestamp::now().offset_secs(-120);
        let nonce = f.engine.nonces().issue_at(60, issued);
        let wire = present(&f, &nonce.value);
        let err = f
            .engine
            .verify("sd-jwt", &wire, "verifier-1", &nonce.value)
            .unwrap_err();
        assert_eq!(err.code(), "NONCE_EXPIRED");
    }

    #[test]
    fn pinned_issuer() {
        let f = fixture();
        let nonce = f.engine.nonces().issue(60);
        let wire = present(&f, &nonce.value);
        let other = IssuerId::new("did:example:other").unwrap();
        let err = f
            .engine
            .verify_from_issuer("sd-jwt", &wire, "verifier-1", &nonce.value, &other)
            .unwrap_err();
        assert_eq!(err.code(), "UNTRUSTED_ISSUER");
        assert!(f.engine.nonces().is_pending(&nonce.value, Timestamp::now()));
    }

    #[test]
    fn unsupported_format() {
        let f = fixture();
        let err = f.engine.verify("mdoc", "x~", "verifier-1", "n1").unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn settings_from_config() {
        let mut config = VerifierConfig::new("verifier-1");
        config.clock_skew_secs = 10;
        config.max_proof_age_secs = 30;
        let settings = EngineSettings::from(&config);
        assert_eq!(settings.clock_skew_secs, 10);
        assert_eq!(settings.max_proof_age_secs, Some(30));
    }
}
