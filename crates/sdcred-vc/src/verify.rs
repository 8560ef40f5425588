//! # Presentation Verification
//!
//! The stateless stages of verification. The caller runs them in order and
//! stops at the first failure:
//!
//! 1. parse the wire string ([`Presentation::parse`])
//! 2. resolve the issuer key and verify the issuer signature
//! 3. match every disclosure against an unused digest in `_sd`
//! 4. verify the holder-binding proof against `cnf`
//! 5. check the audience
//! 6. consume the nonce (stateful, done by the caller)
//! 7. check the validity window ([`CheckedPresentation::check_validity_window`])
//! 8. assemble the result ([`CheckedPresentation::into_verified`])
//!
//! Stages 2 to 5 run in [`check_presentation`]. Nothing here mutates shared
//! state.
//!
//! ## Security Invariant
//!
//! No claim from the payload is trusted before the issuer signature has
//! been checked. Only `iss` is read beforehand, to select the key.

use std::collections::BTreeSet;

use sdcred_core::{IssuerId, SubjectId, Timestamp};
use sdcred_crypto::{jws, CryptoError, Ed25519PublicKey, PublicJwk};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::claims::is_reserved;
use crate::credential::{CorePayload, SD_JWT_TYP};
use crate::disclosure::{recompute, Disclosure};
use crate::error::VerificationError;
use crate::presentation::{KbClaims, Presentation, KB_JWT_TYP};

/// The outcome of a full verification.
pub type VerificationResult = Result<VerifiedClaims, VerificationError>;

/// Default tolerance for clock drift between parties.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 60;

/// Default maximum age of a holder-binding proof.
pub const DEFAULT_MAX_PROOF_AGE_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Looks up the trusted public key for an issuer.
pub trait IssuerKeyResolver: Send + Sync {
    /// Resolve `issuer` to its trusted key.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::UntrustedIssuer` when the issuer is not
    /// trusted.
    fn resolve_issuer(&self, issuer: &IssuerId) -> Result<Ed25519PublicKey, VerificationError>;
}

impl<F> IssuerKeyResolver for F
where
    F: Fn(&IssuerId) -> Option<Ed25519PublicKey> + Send + Sync,
{
    fn resolve_issuer(&self, issuer: &IssuerId) -> Result<Ed25519PublicKey, VerificationError> {
        self(issuer).ok_or_else(|| VerificationError::UntrustedIssuer {
            issuer_id: issuer.to_string(),
            expected: Vec::new(),
        })
    }
}

/// What the verifier expects of a presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// This verifier's identity. When set, the presentation must be
    /// addressed to it.
    pub audience: Option<String>,
    /// The challenge issued to the holder. When set, a holder-binding proof
    /// must carry it.
    pub nonce: Option<String>,
    /// Accept only this issuer.
    pub expected_issuer: Option<IssuerId>,
    /// Tolerance for clock drift, in seconds.
    pub clock_skew_secs: i64,
    /// Oldest acceptable holder-binding proof, in seconds. `None` disables
    /// the check.
    pub max_proof_age_secs: Option<i64>,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            audience: None,
            nonce: None,
            expected_issuer: None,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            max_proof_age_secs: Some(DEFAULT_MAX_PROOF_AGE_SECS),
        }
    }
}

impl VerificationPolicy {
    /// Default skew and proof age, no audience, nonce or pinned issuer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the presentation to be addressed to `audience`.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Require the binding proof to carry `nonce`.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Pin the accepted issuer.
    pub fn with_expected_issuer(mut self, issuer: IssuerId) -> Self {
        self.expected_issuer = Some(issuer);
        self
    }

    /// Set the clock drift tolerance in seconds.
    pub fn with_clock_skew(mut self, secs: i64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    /// Set the oldest acceptable binding proof. `None` disables the check.
    pub fn with_max_proof_age(mut self, secs: Option<i64>) -> Self {
        self.max_proof_age_secs = secs;
        self
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// A presentation that passed stages 2 to 5.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedPresentation {
    payload: CorePayload,
    disclosed: Vec<Disclosure>,
    holder_key: Option<PublicJwk>,
    binding: Option<KbClaims>,
    issued_at: Timestamp,
    expires_at: Option<Timestamp>,
}

/// The verified view of a presentation: always-visible claims plus the
/// disclosed ones, with issuer and subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub issuer: IssuerId,
    pub subject: Option<SubjectId>,
    /// Always-visible claims merged with the disclosed claims.
    pub claims: Map<String, Value>,
    /// The holder key proven by the binding proof.
    pub holder_key: Option<PublicJwk>,
    pub issued_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl CheckedPresentation {
    pub fn issuer(&self) -> &IssuerId {
        &self.payload.iss
    }

    /// Claims from the holder-binding proof, when one was verified.
    pub fn binding(&self) -> Option<&KbClaims> {
        self.binding.as_ref()
    }

    /// Stage 7: `exp` has not passed and `iat` is not in the future, both
    /// with `clock_skew_secs` tolerance.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::CredentialExpired`.
    pub fn check_validity_window(
        &self,
        now: Timestamp,
        clock_skew_secs: i64,
    ) -> Result<(), VerificationError> {
        if let Some(exp) = self.expires_at {
            if now > exp.offset_secs(clock_skew_secs) {
                return Err(VerificationError::CredentialExpired(format!(
                    "expired at {exp}"
                )));
            }
        }
        if self.issued_at > now.offset_secs(clock_skew_secs) {
            return Err(VerificationError::CredentialExpired(format!(
                "issued in the future ({})",
                self.issued_at
            )));
        }
        Ok(())
    }

    /// Stage 8.
    pub fn into_verified(self) -> VerifiedClaims {
        let mut claims = self.payload.visible;
        for d in self.disclosed {
            claims.insert(d.key().to_string(), d.value().clone());
        }
        VerifiedClaims {
            issuer: self.payload.iss,
            subject: self.payload.sub,
            claims,
            holder_key: self.holder_key,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Stages 2-5
// ---------------------------------------------------------------------------

/// Run stages 2 to 5 against a parsed presentation.
pub fn check_presentation(
    presentation: &Presentation,
    issuers: &dyn IssuerKeyResolver,
    policy: &VerificationPolicy,
    now: Timestamp,
) -> Result<CheckedPresentation, VerificationError> {
    let payload = verify_issuer_signature(presentation, issuers, policy)?;
    let disclosed = match_disclosures(presentation, &payload)?;
    let binding = verify_holder_binding(presentation, &payload, policy, now)?;
    check_audience(&payload, binding.as_ref(), policy)?;

    let issued_at = epoch_to_timestamp("iat", payload.iat)?;
    let expires_at = payload.exp.map(|e| epoch_to_timestamp("exp", e)).transpose()?;
    let holder_key = binding.as_ref().and(payload.holder_jwk().cloned());

    Ok(CheckedPresentation {
        payload,
        disclosed,
        holder_key,
        binding,
        issued_at,
        expires_at,
    })
}

fn verify_issuer_signature(
    presentation: &Presentation,
    issuers: &dyn IssuerKeyResolver,
    policy: &VerificationPolicy,
) -> Result<CorePayload, VerificationError> {
    let token = jws::decode_unverified(&presentation.issuer_token).map_err(|e| match e {
        CryptoError::UnsupportedAlgorithm(alg) => {
            VerificationError::SignatureInvalid(format!("unsupported algorithm {alg}"))
        }
        other => VerificationError::MalformedPresentation(other.to_string()),
    })?;
    if token.header.typ.as_deref() != Some(SD_JWT_TYP) {
        return Err(VerificationError::MalformedPresentation(format!(
            "issuer token typ must be {SD_JWT_TYP}"
        )));
    }

    let iss = token
        .claims
        .get("iss")
        .and_then(Value::as_str)
        .ok_or_else(|| VerificationError::MalformedPresentation("missing iss".into()))?;
    let issuer = IssuerId::new(iss)
        .map_err(|e| VerificationError::MalformedPresentation(format!("invalid iss: {e}")))?;

    if let Some(expected) = &policy.expected_issuer {
        if expected != &issuer {
            return Err(VerificationError::UntrustedIssuer {
                issuer_id: issuer.to_string(),
                expected: vec![expected.to_string()],
            });
        }
    }

    let key = issuers.resolve_issuer(&issuer)?;
    token
        .verify(&key)
        .map_err(|e| VerificationError::SignatureInvalid(e.to_string()))?;

    token
        .claims_as::<CorePayload>()
        .map_err(|e| VerificationError::MalformedPresentation(e.to_string()))
}

fn match_disclosures(
    presentation: &Presentation,
    payload: &CorePayload,
) -> Result<Vec<Disclosure>, VerificationError> {
    let mut unused: Vec<&str> = payload.sd.iter().map(String::as_str).collect();
    let mut seen_keys = BTreeSet::new();
    let mut disclosed = Vec::with_capacity(presentation.disclosures.len());

    for (index, token) in presentation.disclosures.iter().enumerate() {
        let digest = recompute(token);
        let Some(pos) = unused.iter().position(|d| *d == digest) else {
            return Err(VerificationError::DisclosureMismatch(format!(
                "disclosure {index} does not match an unused digest"
            )));
        };
        unused.swap_remove(pos);

        let disclosure = Disclosure::decode(token).map_err(|e| {
            VerificationError::MalformedPresentation(format!("disclosure {index}: {e}"))
        })?;
        let key = disclosure.key();
        if is_reserved(key) {
            return Err(VerificationError::DisclosureMismatch(format!(
                "disclosure {index} uses reserved claim name \"{key}\""
            )));
        }
        if payload.visible.contains_key(key) || !seen_keys.insert(key.to_string()) {
            return Err(VerificationError::DisclosureMismatch(format!(
                "claim \"{key}\" is disclosed more than once"
            )));
        }
        disclosed.push(disclosure);
    }
    Ok(disclosed)
}

fn verify_holder_binding(
    presentation: &Presentation,
    payload: &CorePayload,
    policy: &VerificationPolicy,
    now: Timestamp,
) -> Result<Option<KbClaims>, VerificationError> {
    let invalid = VerificationError::HolderBindingInvalid;
    let (jwk, kb_token) = match (payload.holder_jwk(), presentation.binding_token.as_deref()) {
        (None, None) => return Ok(None),
        (Some(_), None) => return Err(VerificationError::HolderBindingMissing),
        (None, Some(_)) => {
            return Err(invalid("credential declares no holder key".into()));
        }
        (Some(jwk), Some(kb)) => (jwk, kb),
    };

    let holder_key = jwk
        .to_public_key()
        .map_err(|e| invalid(format!("cnf key: {e}")))?;
    let token = jws::decode(kb_token, &holder_key).map_err(|e| invalid(e.to_string()))?;
    if token.header.typ.as_deref() != Some(KB_JWT_TYP) {
        return Err(invalid(format!("binding proof typ must be {KB_JWT_TYP}")));
    }
    let kb: KbClaims = token.claims_as().map_err(|e| invalid(e.to_string()))?;

    if kb.sd_hash != presentation.sd_hash() {
        return Err(invalid("sd_hash does not cover the presented disclosures".into()));
    }
    if let Some(nonce) = &policy.nonce {
        if &kb.nonce != nonce {
            return Err(invalid("nonce does not match the challenge".into()));
        }
    }
    let now_secs = now.epoch_secs();
    if kb.iat > now_secs.saturating_add(policy.clock_skew_secs) {
        return Err(invalid("proof issued in the future".into()));
    }
    if let Some(max_age) = policy.max_proof_age_secs {
        if kb.iat < now_secs.saturating_sub(max_age) {
            return Err(invalid(format!("proof older than {max_age}s")));
        }
    }
    Ok(Some(kb))
}

fn check_audience(
    payload: &CorePayload,
    binding: Option<&KbClaims>,
    policy: &VerificationPolicy,
) -> Result<(), VerificationError> {
    let Some(expected) = &policy.audience else {
        return Ok(());
    };
    let actual = match binding {
        Some(kb) => Some(kb.aud.as_str()),
        None => payload.aud.as_deref(),
    };
    if actual == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(VerificationError::AudienceMismatch {
            expected: expected.clone(),
            actual: actual.map(str::to_string),
        })
    }
}

fn epoch_to_timestamp(name: &str, secs: i64) -> Result<Timestamp, VerificationError> {
    Timestamp::from_epoch_secs(secs)
        .map_err(|e| VerificationError::MalformedPresentation(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdcred_crypto::Ed25519KeyPair;
    use serde_json::json;

    fn issuer() -> IssuerId {
        IssuerId::new("did:example:issuer").unwrap()
    }

    fn sign_core(kp: &Ed25519KeyPair, claims: Value) -> String {
        jws::encode(SD_JWT_TYP, &claims, kp).unwrap()
    }

    fn resolver(kp: &Ed25519KeyPair) -> impl IssuerKeyResolver {
        let key = kp.public_key();
        move |id: &IssuerId| (id.as_str() == "did:example:issuer").then(|| key.clone())
    }

    fn unbound(core: String, disclosures: Vec<String>) -> Presentation {
        Presentation {
            issuer_token: core,
            disclosures,
            binding_token: None,
        }
    }

    #[test]
    fn closure_resolver_reports_untrusted() {
        let kp = Ed25519KeyPair::generate();
        let r = resolver(&kp);
        let other = IssuerId::new("did:example:other").unwrap();
        assert_eq!(r.resolve_issuer(&other).unwrap_err().code(), "UNTRUSTED_ISSUER");
        assert_eq!(r.resolve_issuer(&issuer()).unwrap(), kp.public_key());
    }

    #[test]
    fn pinned_issuer_rejects_other_trusted_issuers() {
        let kp = Ed25519KeyPair::generate();
        let core = sign_core(&kp, json!({"iss": "did:example:issuer", "iat": 1_700_000_000}));
        let policy = VerificationPolicy::new()
            .with_expected_issuer(IssuerId::new("did:example:pinned").unwrap());
        let err = check_presentation(&unbound(core, vec![]), &resolver(&kp), &policy, Timestamp::now())
            .unwrap_err();
        assert_eq!(
            err,
            VerificationError::UntrustedIssuer {
                issuer_id: "did:example:issuer".into(),
                expected: vec!["did:example:pinned".into()],
            }
        );
    }

    #[test]
    fn reserved_name_in_disclosure_rejected() {
        let kp = Ed25519KeyPair::generate();
        let d = Disclosure::new("salt", "iss", json!("did:example:evil")).unwrap();
        let core = sign_core(
            &kp,
            json!({"iss": "did:example:issuer", "iat": 1_700_000_000, "_sd": [d.digest()]}),
        );
        let p = unbound(core, vec![d.encoded().to_string()]);
        let err = check_presentation(&p, &resolver(&kp), &VerificationPolicy::new(), Timestamp::now())
            .unwrap_err();
        assert_eq!(err.code(), "DISCLOSURE_MISMATCH");
    }

    #[test]
    fn disclosure_shadowing_visible_claim_rejected() {
        let kp = Ed25519KeyPair::generate();
        let d = Disclosure::new("salt", "nationality", json!("XX")).unwrap();
        let core = sign_core(
            &kp,
            json!({
                "iss": "did:example:issuer", "iat": 1_700_000_000,
                "nationality": "AT", "_sd": [d.digest()]
            }),
        );
        let p = unbound(core, vec![d.encoded().to_string()]);
        let err = check_presentation(&p, &resolver(&kp), &VerificationPolicy::new(), Timestamp::now())
            .unwrap_err();
        assert_eq!(err.code(), "DISCLOSURE_MISMATCH");
    }

    #[test]
    fn same_disclosure_twice_rejected() {
        let kp = Ed25519KeyPair::generate();
        let d = Disclosure::new("salt", "email", json!("jon@example.com")).unwrap();
        let core = sign_core(
            &kp,
            json!({"iss": "did:example:issuer", "iat": 1_700_000_000, "_sd": [d.digest()]}),
        );
        let p = unbound(core, vec![d.encoded().to_string(), d.encoded().to_string()]);
        let err = check_presentation(&p, &resolver(&kp), &VerificationPolicy::new(), Timestamp::now())
            .unwrap_err();
        assert_eq!(err.code(), "DISCLOSURE_MISMATCH");
    }

    #[test]
    fn core_audience_used_without_binding() {
        let kp = Ed25519KeyPair::generate();
        let core = sign_core(
            &kp,
            json!({"iss": "did:example:issuer", "iat": 1_700_000_000, "aud": "verifier-1"}),
        );
        let p = unbound(core, vec![]);
        let ok = VerificationPolicy::new().with_audience("verifier-1");
        assert!(check_presentation(&p, &resolver(&kp), &ok, Timestamp::now()).is_ok());

        let wrong = VerificationPolicy::new().with_audience("verifier-2");
        assert_eq!(
            check_presentation(&p, &resolver(&kp), &wrong, Timestamp::now()).unwrap_err(),
            VerificationError::AudienceMismatch {
                expected: "verifier-2".into(),
                actual: Some("verifier-1".into()),
            }
        );
    }

    #[test]
    fn missing_core_audience_is_a_mismatch() {
        let kp = Ed25519KeyPair::generate();
        let core = sign_core(&kp, json!({"iss": "did:example:issuer", "iat": 1_700_000_000}));
        let policy = VerificationPolicy::new().with_audience("verifier-1");
        let err = check_presentation(&unbound(core, vec![]), &resolver(&kp), &policy, Timestamp::now())
            .unwrap_err();
        assert_eq!(err.code(), "AUDIENCE_MISMATCH");
    }

    #[test]
    fn wrong_typ_is_malformed() {
        let kp = Ed25519KeyPair::generate();
        let core = jws::encode("JWT", &json!({"iss": "did:example:issuer", "iat": 1}), &kp).unwrap();
        let err = check_presentation(
            &unbound(core, vec![]),
            &resolver(&kp),
            &VerificationPolicy::new(),
            Timestamp::now(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "MALFORMED_PRESENTATION");
    }

    #[test]
    fn validity_window() {
        let kp = Ed25519KeyPair::generate();
        let now = Timestamp::from_epoch_secs(1_700_000_000).unwrap();
        let check = |iat: i64, exp: Option<i64>| {
            let mut claims = json!({"iss": "did:example:issuer", "iat": iat});
            if let Some(exp) = exp {
                claims["exp"] = json!(exp);
            }
            let core = sign_core(&kp, claims);
            check_presentation(&unbound(core, vec![]), &resolver(&kp), &VerificationPolicy::new(), now)
                .unwrap()
                .check_validity_window(now, 60)
        };
        assert!(check(1_699_999_000, Some(1_700_001_000)).is_ok());
        assert!(check(1_699_999_000, Some(1_699_999_970)).is_ok());
        assert!(check(1_699_999_000, Some(1_699_999_900)).is_err());
        assert!(check(1_700_000_030, None).is_ok());
        assert!(check(1_700_000_500, None).is_err());
    }
}
